//! XLSX workbook reader (calamine)
//!
//! Study logs are exported with a five-row banner above the header row;
//! [`HEADER_ROWS`] rows are skipped, the next row names the columns, and
//! fully-empty columns are discarded before the table reaches the parser.

use super::{Cell, SheetTable, WorkbookSource};
use crate::{Error, Result};
use calamine::{open_workbook, Data, DataType as _, Reader, Xlsx};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Banner rows above the header row in every measurement sheet.
pub const HEADER_ROWS: usize = 5;

/// Workbook backed by an `.xlsx` file on disk.
pub struct XlsxWorkbook {
    workbook: Xlsx<BufReader<File>>,
    sheet_names: Vec<String>,
}

impl XlsxWorkbook {
    /// Open a workbook file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the path does not exist, or
    /// [`Error::Workbook`] if the file is not a readable xlsx archive.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }

        let workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| Error::Workbook(format!("failed to open `{}`: {e}", path.display())))?;
        let sheet_names = workbook.sheet_names().to_owned();

        Ok(Self {
            workbook,
            sheet_names,
        })
    }

    fn convert(cell: &Data) -> Cell {
        match cell {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => {
                #[allow(clippy::cast_precision_loss)]
                Cell::Number(*i as f64)
            }
            Data::Bool(b) => Cell::Number(f64::from(*b)),
            Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => {
                cell.as_datetime().map_or(Cell::Empty, Cell::DateTime)
            }
        }
    }

    fn header_label(cell: &Data, col: usize) -> String {
        match Self::convert(cell) {
            Cell::Text(s) => s,
            Cell::Number(n) => n.to_string(),
            // pandas-style placeholder for blank header cells
            _ => format!("Unnamed: {col}"),
        }
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheet_names.clone()
    }

    fn read_sheet(&mut self, name: &str) -> Result<SheetTable> {
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| Error::Workbook(format!("failed to read sheet `{name}`: {e}")))?;

        // The decoded range starts at its first non-empty cell, so the
        // banner offset is relative to the range origin, not the file.
        let start_row = range.start().map_or(0, |(row, _)| row as usize);
        let header_offset = HEADER_ROWS.saturating_sub(start_row);

        let mut rows = range.rows().skip(header_offset);
        let header = rows.next().ok_or_else(|| {
            Error::Workbook(format!("sheet `{name}` has no header row after the banner"))
        })?;

        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(col, cell)| Self::header_label(cell, col))
            .collect();

        let data: Vec<Vec<Cell>> = rows
            .map(|row| row.iter().map(Self::convert).collect())
            .collect();

        let mut table = SheetTable::new(name, columns, data);
        table.drop_empty_columns();
        Ok(table)
    }
}
