use shared::{Field, Record};

/// Whether `current` is a different media event than `previous`.
///
/// Only the key fields (artist, title, name) are compared: a repeat with a new
/// timestamp or refreshed links is still the same event.
pub fn changed(previous: Option<&Record>, current: &Record) -> bool {
    match previous {
        None => true,
        Some(previous) => Field::KEY
            .iter()
            .any(|&f| previous.field(f) != current.field(f)),
    }
}
