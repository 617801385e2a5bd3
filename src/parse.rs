//! Record parser
//!
//! Projects a raw sheet table to the canonical five-column schema and
//! tags every row with its measurement kind. Date and time cells are
//! coerced here (any unparseable non-empty cell fails the sheet); the
//! animal identifier stays raw because format validation belongs to the
//! dataset builder, where the strict/lenient policy applies.

use crate::record::DataType;
use crate::workbook::{Cell, SheetTable};
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// Canonical column labels, in sheet order.
pub const CANONICAL_COLUMNS: [&str; 5] =
    ["Animal ID", "Date", "Value", "Recorded Time", "Entered by"];

/// One parsed sheet row, before identifier validation and time-origin
/// alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Measurement kind tag
    pub data_type: DataType,
    /// Animal identifier as written in the sheet, not yet validated
    pub animal_id: String,
    /// Calendar date of the measurement
    pub date: NaiveDate,
    /// Measured value; absent for mortality rows
    pub value: Option<f64>,
    /// Entry timestamp, informational
    pub recorded_time: Option<NaiveDateTime>,
    /// Who entered the row, informational
    pub entered_by: Option<String>,
}

/// Parse a sheet into raw records, dropping columns outside the canonical
/// set. No rows are filtered at this stage.
///
/// # Errors
///
/// Returns [`Error::Workbook`] if a canonical column is missing, or
/// [`Error::Parse`] if a date/time/value cell cannot be coerced.
pub fn parse_sheet(table: &SheetTable, data_type: &DataType) -> Result<Vec<RawRecord>> {
    let mut indices = [0usize; 5];
    for (slot, label) in indices.iter_mut().zip(CANONICAL_COLUMNS) {
        *slot = table.column_index(label).ok_or_else(|| {
            Error::Workbook(format!(
                "sheet `{}` is missing column `{label}`",
                table.name()
            ))
        })?;
    }
    let [id_col, date_col, value_col, time_col, by_col] = indices;

    let mut records = Vec::with_capacity(table.num_rows());
    for row in 0..table.num_rows() {
        let parse_err = |message: String| {
            Error::Parse(format!("sheet `{}`, row {row}: {message}", table.name()))
        };

        let animal_id = coerce_id(table.cell(row, id_col));

        let date = match table.cell(row, date_col) {
            Cell::DateTime(dt) => dt.date(),
            Cell::Text(s) => parse_date_text(s)
                .ok_or_else(|| parse_err(format!("cannot coerce `{s}` to a date")))?,
            Cell::Empty => return Err(parse_err("missing date".to_string())),
            Cell::Number(n) => {
                return Err(parse_err(format!("cannot coerce number `{n}` to a date")))
            }
        };

        let value = match table.cell(row, value_col) {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => Some(
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| parse_err(format!("cannot coerce `{s}` to a number")))?,
            ),
            Cell::DateTime(dt) => {
                return Err(parse_err(format!("cannot coerce date `{dt}` to a number")))
            }
        };

        let recorded_time = match table.cell(row, time_col) {
            Cell::Empty => None,
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => Some(
                parse_datetime_text(s)
                    .ok_or_else(|| parse_err(format!("cannot coerce `{s}` to a timestamp")))?,
            ),
            Cell::Number(n) => {
                return Err(parse_err(format!("cannot coerce number `{n}` to a timestamp")))
            }
        };

        let entered_by = match table.cell(row, by_col) {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::DateTime(dt) => Some(dt.to_string()),
        };

        records.push(RawRecord {
            data_type: data_type.clone(),
            animal_id,
            date,
            value,
            recorded_time,
            entered_by,
        });
    }

    Ok(records)
}

/// Stringify an identifier cell the way the validation step will see it.
/// Integral numbers render without a trailing `.0`; anything else keeps
/// its display form and fails the format check later.
fn coerce_id(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.trim().to_string(),
        #[allow(clippy::cast_possible_truncation)]
        Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        Cell::Number(n) => n.to_string(),
        Cell::DateTime(dt) => dt.to_string(),
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime_text(s).map(|dt| dt.date()))
}

fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
