use serde::{Deserialize, Serialize};
use shared::{Dataset, Record};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::CodecError;
use crate::traits::Codec;

/// On-disk JSON layout. The column list is stored explicitly so the shape
/// survives rows with missing fields.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Table {
        columns: Vec<String>,
        records: Vec<Record>,
    },
    /// A bare array of objects, as written by most other tools.
    Records(Vec<Record>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn read(&self, path: &Path) -> Result<Dataset, CodecError> {
        let file = File::open(path).map_err(|e| CodecError::io(path, e))?;
        let document: JsonDocument = serde_json::from_reader(BufReader::new(file))?;
        Ok(match document {
            JsonDocument::Table { columns, records } => Dataset::with_columns(columns, records),
            JsonDocument::Records(records) => Dataset::from_records(records),
        })
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> Result<(), CodecError> {
        let file = File::create(path).map_err(|e| CodecError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let document = JsonDocument::Table {
            columns: dataset.columns().to_vec(),
            records: dataset.rows().to_vec(),
        };
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.flush().map_err(|e| CodecError::io(path, e))?;
        Ok(())
    }
}
