//! Concrete dataset codecs, one per physical file format.

mod columnar;
mod delimited;
mod json;
mod spreadsheet;
mod sqlite;

pub use columnar::{ArrowIpcCodec, ParquetCodec};
pub use delimited::DelimitedCodec;
pub use json::JsonCodec;
pub use spreadsheet::SpreadsheetCodec;
pub use sqlite::{SqliteCodec, EVENTS_TABLE};

use shared::{Dataset, Record};

/// Cells of `row` in dataset column order; `None` where the record has no
/// value for a column.
fn cells<'a>(dataset: &'a Dataset, row: &'a Record) -> impl Iterator<Item = Option<&'a str>> {
    dataset.columns().iter().map(move |c| row.get(c))
}

/// Rebuilds a record from column names and optional cells, dropping nulls.
fn record_from<I, S>(columns: &[String], cells: I) -> Record
where
    I: IntoIterator<Item = Option<S>>,
    S: Into<String>,
{
    columns
        .iter()
        .zip(cells)
        .filter_map(|(c, v)| v.map(|v| (c.clone(), v.into())))
        .collect()
}
