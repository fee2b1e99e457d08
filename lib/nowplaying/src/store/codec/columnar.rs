//! Arrow based codecs: Parquet files and Arrow IPC ("feather") files.
//!
//! Every column is stored as nullable UTF-8. Columns of other types written by
//! other tools are cast to text on read.

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use shared::{Dataset, Record};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use super::record_from;
use crate::error::CodecError;
use crate::traits::Codec;

fn schema_of(dataset: &Dataset) -> SchemaRef {
    Arc::new(Schema::new(
        dataset
            .columns()
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

fn to_batch(dataset: &Dataset) -> Result<RecordBatch, CodecError> {
    let schema = schema_of(dataset);
    let arrays: Vec<ArrayRef> = dataset
        .columns()
        .iter()
        .map(|column| {
            let values: StringArray = dataset.rows().iter().map(|r| r.get(column)).collect();
            Arc::new(values) as ArrayRef
        })
        .collect();
    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn to_dataset(
    path: &Path,
    schema: &Schema,
    batches: impl IntoIterator<Item = Result<RecordBatch, arrow::error::ArrowError>>,
) -> Result<Dataset, CodecError> {
    let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let mut records: Vec<Record> = Vec::new();

    for batch in batches {
        let batch = batch?;
        let mut text_columns = Vec::with_capacity(batch.num_columns());
        for column in batch.columns() {
            text_columns.push(cast(column, &DataType::Utf8)?);
        }
        let strings = text_columns
            .iter()
            .map(|c| {
                c.as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| CodecError::invalid(path, "column is not text after cast"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            records.push(record_from(
                &columns,
                strings
                    .iter()
                    .map(|c| (!c.is_null(row)).then(|| c.value(row))),
            ));
        }
    }

    Ok(Dataset::with_columns(columns, records))
}

/// Columnar file format, one row group per write.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetCodec;

impl Codec for ParquetCodec {
    fn name(&self) -> &'static str {
        "parquet"
    }

    fn read(&self, path: &Path) -> Result<Dataset, CodecError> {
        let file = File::open(path).map_err(|e| CodecError::io(path, e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;
        to_dataset(path, &schema, reader)
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> Result<(), CodecError> {
        let batch = to_batch(dataset)?;
        let file = File::create(path).map_err(|e| CodecError::io(path, e))?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }
}

/// Arrow IPC file format, the on-disk layout of Feather v2.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowIpcCodec;

impl Codec for ArrowIpcCodec {
    fn name(&self) -> &'static str {
        "feather"
    }

    fn read(&self, path: &Path) -> Result<Dataset, CodecError> {
        let file = File::open(path).map_err(|e| CodecError::io(path, e))?;
        let reader = FileReader::try_new(file, None)?;
        let schema = reader.schema();
        to_dataset(path, &schema, reader)
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> Result<(), CodecError> {
        let batch = to_batch(dataset)?;
        let file = File::create(path).map_err(|e| CodecError::io(path, e))?;
        let mut writer = FileWriter::try_new(file, &batch.schema())?;
        writer.write(&batch)?;
        writer.finish()?;
        Ok(())
    }
}
