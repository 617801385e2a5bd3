//! Sheet locator
//!
//! Study logs name their measurement sheets by convention: `Data BW` for
//! bodyweight, `Data MO` for mortality (both exact matches), and any sheet
//! whose name contains `TV` for tumor volume. A sheet may satisfy more
//! than one rule; no precedence is applied, since only the tumor-volume
//! rule is a substring match.

use serde::Serialize;

/// Exact name of the bodyweight sheet.
pub const BODYWEIGHT_SHEET: &str = "Data BW";

/// Exact name of the mortality sheet.
pub const MORTALITY_SHEET: &str = "Data MO";

/// Substring marking a tumor-volume sheet.
pub const TUMOR_VOLUME_MARKER: &str = "TV";

/// Classification of a workbook's sheets by naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetCatalog {
    /// Whether an exact-match bodyweight sheet is present
    pub has_bodyweight: bool,
    /// Whether an exact-match mortality sheet is present
    pub has_mortality: bool,
    /// Tumor-volume sheet names, in workbook order
    pub tumor_volume_sheets: Vec<String>,
}

impl SheetCatalog {
    /// Classify sheet names. Absence of bodyweight or mortality sheets is
    /// not an error; zero or many tumor-volume sheets are all fine.
    #[must_use]
    pub fn locate(sheet_names: &[String]) -> Self {
        let has_bodyweight = sheet_names.iter().any(|n| n == BODYWEIGHT_SHEET);
        let has_mortality = sheet_names.iter().any(|n| n == MORTALITY_SHEET);
        let tumor_volume_sheets = sheet_names
            .iter()
            .filter(|n| n.contains(TUMOR_VOLUME_MARKER))
            .cloned()
            .collect();

        Self {
            has_bodyweight,
            has_mortality,
            tumor_volume_sheets,
        }
    }
}
