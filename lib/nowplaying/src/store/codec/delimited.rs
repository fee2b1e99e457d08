use shared::Dataset;
use std::path::Path;

use super::{cells, record_from};
use crate::error::CodecError;
use crate::traits::Codec;

/// Comma separated text with a header row. Missing cells are written empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedCodec;

impl Codec for DelimitedCodec {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn read(&self, path: &Path) -> Result<Dataset, CodecError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row?;
            rows.push(record_from(&columns, row.iter().map(Some)));
        }
        Ok(Dataset::with_columns(columns, rows))
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> Result<(), CodecError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(dataset.columns())?;
        for row in dataset.rows() {
            writer.write_record(cells(dataset, row).map(Option::unwrap_or_default))?;
        }
        writer.flush().map_err(|e| CodecError::io(path, e))?;
        Ok(())
    }
}
