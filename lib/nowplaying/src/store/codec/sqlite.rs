use rusqlite::{params_from_iter, Connection};
use shared::Dataset;
use std::path::Path;

use super::{cells, record_from};
use crate::error::CodecError;
use crate::traits::Codec;

/// Table holding the logged events.
pub const EVENTS_TABLE: &str = "events";

/// A SQLite database with a single all-TEXT table. Missing cells are NULL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteCodec;

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

impl Codec for SqliteCodec {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn read(&self, path: &Path) -> Result<Dataset, CodecError> {
        let conn = Connection::open(path)?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote(EVENTS_TABLE)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let width = columns.len();
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Option<String>>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(record_from(&columns, row?));
        }
        Ok(Dataset::with_columns(columns, records))
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> Result<(), CodecError> {
        if dataset.columns().is_empty() {
            return Err(CodecError::invalid(path, "dataset has no columns"));
        }

        let mut conn = Connection::open(path)?;
        let tx = conn.transaction()?;

        let table = quote(EVENTS_TABLE);
        let definitions: Vec<String> = dataset
            .columns()
            .iter()
            .map(|c| format!("{} TEXT", quote(c)))
            .collect();
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({});",
            definitions.join(", ")
        ))?;

        {
            let names: Vec<String> = dataset.columns().iter().map(|c| quote(c)).collect();
            let placeholders = vec!["?"; names.len()].join(", ");
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                names.join(", ")
            ))?;
            for row in dataset.rows() {
                insert.execute(params_from_iter(cells(dataset, row)))?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::codec::test_support::{reread, sample};
    use shared::Record;

    #[test]
    fn round_trips_and_keeps_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.db");
        assert_eq!(reread(&SqliteCodec, &path, &sample()), sample());

        let sparse = Dataset::with_columns(
            vec!["title".into(), "artist".into()],
            vec![Record::new().with("title", "T")],
        );
        let back = reread(&SqliteCodec, &path, &sparse);
        assert_eq!(back.columns(), ["title", "artist"]);
        assert_eq!(back.cell(0, "artist"), None);

        let conn = Connection::open(&path).unwrap();
        let nulls: i64 = conn
            .query_row("SELECT COUNT(*) FROM events WHERE artist IS NULL", [], |r| r.get(0))
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn database_without_events_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (x TEXT);")
            .unwrap();
        assert!(matches!(SqliteCodec.read(&path), Err(CodecError::Sqlite(_))));
    }
}
