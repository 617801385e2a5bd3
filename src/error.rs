//! Error types for the study-log analyzer
//!
//! Errors surface to the caller immediately; construction either fully
//! succeeds or fully fails (lenient identifier handling is a documented
//! partial-failure policy, not an error).

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Study-log analyzer error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input workbook does not exist
    #[error("data file not found: {0}")]
    NotFound(String),

    /// Date/time/value coercion failed
    #[error("parse error: {0}")]
    Parse(String),

    /// Identifier failed strict-mode format validation
    #[error("animal ID `{value}` does not match the format `{pattern}`")]
    Validation {
        /// The offending identifier
        value: String,
        /// The expected pattern
        pattern: &'static str,
    },

    /// Group-name count does not match the number of distinct groups
    #[error("number of group names ({supplied}) must match the number of groups ({expected})")]
    Cardinality {
        /// Names supplied by the caller
        supplied: usize,
        /// Distinct groups currently present
        expected: usize,
    },

    /// Referenced group or date is not present in the dataset
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// Workbook shape problem (unreadable sheet, missing columns, no data)
    #[error("workbook error: {0}")]
    Workbook(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
