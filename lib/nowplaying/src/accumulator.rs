use shared::Record;

/// Novel records identified during this session, in poll order, not yet
/// persisted. Duplicates are resolved later by the store.
#[derive(Debug, Default)]
pub struct Accumulator {
    records: Vec<Record>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Takes every pending record, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }
}
