use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use shared::Dataset;
use std::path::Path;

use super::{cells, record_from};
use crate::error::CodecError;
use crate::traits::Codec;

/// First worksheet of an `.xlsx` workbook, header in the first row.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetCodec;

fn spreadsheet_err(e: impl ToString) -> CodecError {
    CodecError::Spreadsheet(e.to_string())
}

impl Codec for SpreadsheetCodec {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn read(&self, path: &Path) -> Result<Dataset, CodecError> {
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(spreadsheet_err)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| CodecError::invalid(path, "workbook has no worksheet"))?
            .map_err(spreadsheet_err)?;

        let mut rows = range.rows();
        let columns: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();

        let records = rows
            .map(|row| {
                let values = row.iter().map(|cell| match cell {
                    Data::Empty => None,
                    other => Some(other.to_string()),
                });
                record_from(&columns, values)
            })
            .collect();
        Ok(Dataset::with_columns(columns, records))
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> Result<(), CodecError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (col, name) in dataset.columns().iter().enumerate() {
            let col = u16::try_from(col).map_err(spreadsheet_err)?;
            sheet.write_string(0, col, name).map_err(spreadsheet_err)?;
        }
        for (index, row) in dataset.rows().iter().enumerate() {
            let line = u32::try_from(index + 1).map_err(spreadsheet_err)?;
            for (col, value) in cells(dataset, row).enumerate() {
                if let Some(value) = value {
                    let col = u16::try_from(col).map_err(spreadsheet_err)?;
                    sheet.write_string(line, col, value).map_err(spreadsheet_err)?;
                }
            }
        }

        workbook.save(path).map_err(spreadsheet_err)?;
        Ok(())
    }
}
