//! Workbook seam
//!
//! The analyzer core is specified against [`WorkbookSource`]: anything
//! that can list sheet names and return a sheet as a table of named
//! columns. [`XlsxWorkbook`] is the production implementation (calamine);
//! [`MemoryWorkbook`] backs tests and in-process pipelines.

mod xlsx;

pub use xlsx::{XlsxWorkbook, HEADER_ROWS};

use crate::{Error, Result};
use chrono::NaiveDateTime;

/// One cell of a raw sheet, before schema projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Blank or whitespace-only cell
    Empty,
    /// Textual cell
    Text(String),
    /// Numeric cell
    Number(f64),
    /// Date/time cell as decoded by the workbook reader
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Whether the cell carries no value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A raw sheet as a table of rows with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    /// Create a table from a header row and data rows.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Sheet name as it appears in the workbook.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column labels, in sheet order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by label.
    #[must_use]
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Cell at `(row, col)`; out-of-range reads are [`Cell::Empty`]
    /// (ragged rows are treated as padded with blanks).
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    /// Remove columns whose data cells are all empty, keeping the rest in
    /// sheet order. Study-log exports pad sheets with blank columns; the
    /// canonical five-column schema is selected downstream by label.
    pub fn drop_empty_columns(&mut self) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&col| self.rows.iter().any(|r| r.get(col).is_some_and(|c| !c.is_empty())))
            .collect();

        if keep.len() == self.columns.len() {
            return;
        }

        self.columns = keep.iter().map(|&c| self.columns[c].clone()).collect();
        for row in &mut self.rows {
            *row = keep
                .iter()
                .map(|&c| row.get(c).cloned().unwrap_or(Cell::Empty))
                .collect();
        }
    }
}

/// Capability the analyzer requires of a workbook.
pub trait WorkbookSource {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Read one sheet as a table of named columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Workbook`] if the sheet does not exist or cannot
    /// be decoded.
    fn read_sheet(&mut self, name: &str) -> Result<SheetTable>;
}

/// In-memory workbook of pre-built tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<SheetTable>,
}

impl MemoryWorkbook {
    /// Create an empty workbook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, preserving insertion order.
    #[must_use]
    pub fn with_sheet(mut self, sheet: SheetTable) -> Self {
        self.sheets.push(sheet);
        self
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<SheetTable> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| Error::Workbook(format!("sheet `{name}` not found")))
    }
}
