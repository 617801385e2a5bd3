//! Record schema for the master longitudinal table
//!
//! Every parsed sheet row becomes one [`Record`]. The measurement kind,
//! animal identifier, and group label are explicit types checked at the
//! parse boundary rather than stringly-typed columns inspected at point
//! of use.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expected animal-identifier format: `<group>-<index>`, both parts
/// non-negative integers.
pub const ANIMAL_ID_PATTERN: &str = r"^\d+-\d+$";

/// Validated animal identifier of the form `"<group>-<index>"`.
///
/// The group prefix and animal index are parsed once at construction so
/// group derivation never re-inspects the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnimalId {
    raw: String,
    group: u32,
    index: u32,
}

impl AnimalId {
    /// Parse and validate an identifier against [`ANIMAL_ID_PATTERN`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) if the
    /// string is not two hyphen-separated runs of ASCII digits (or a run
    /// overflows `u32`).
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let invalid = || crate::Error::Validation {
            value: raw.to_string(),
            pattern: ANIMAL_ID_PATTERN,
        };

        let (prefix, suffix) = raw.split_once('-').ok_or_else(invalid)?;
        if prefix.is_empty()
            || suffix.is_empty()
            || !prefix.bytes().all(|b| b.is_ascii_digit())
            || !suffix.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let group = prefix.parse().map_err(|_| invalid())?;
        let index = suffix.parse().map_err(|_| invalid())?;

        Ok(Self {
            raw: raw.to_string(),
            group,
            index,
        })
    }

    /// Whether a string satisfies the identifier pattern.
    #[must_use]
    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// The identifier as entered (e.g. `"3-12"`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Integer group prefix (the part before the hyphen).
    #[must_use]
    pub const fn group_prefix(&self) -> u32 {
        self.group
    }

    /// Integer animal index within the group (the part after the hyphen).
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }
}

impl TryFrom<String> for AnimalId {
    type Error = crate::Error;

    fn try_from(raw: String) -> crate::Result<Self> {
        Self::parse(&raw)
    }
}

impl From<AnimalId> for String {
    fn from(id: AnimalId) -> Self {
        id.raw
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Group label: the integer prefix derived from [`AnimalId`], or the
/// display name assigned by a later renaming.
///
/// Ordering is numeric for `Numeric` labels and lexicographic for `Named`
/// labels (numeric sorts before named). Once groups have been renamed the
/// lexicographic order can differ from the original numeric order; group
/// summaries and renaming both sort by this ordering, so numeric-looking
/// names reorder the way strings do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupId {
    /// Integer prefix as derived from the animal identifier
    Numeric(u32),
    /// Caller-assigned display name
    Named(String),
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<u32> for GroupId {
    fn from(n: u32) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for GroupId {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// Measurement kind of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Bodyweight reading
    Bodyweight,
    /// Mortality event (the record's date is the death date)
    Mortality,
    /// Tumor-volume reading, tagged with the originating sheet label so
    /// bilateral-flank and multi-tumor studies stay distinguishable
    TumorVolume(String),
}

impl DataType {
    /// Column label as written in the study log.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bodyweight => f.write_str("Bodyweight"),
            Self::Mortality => f.write_str("Mortality"),
            Self::TumorVolume(name) => write!(f, "Tumor Volume {name}"),
        }
    }
}

/// One row of the master longitudinal table.
///
/// `data_type` leads the field order, mirroring the column-first layout
/// that downstream consumers of the tabular form expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub(crate) data_type: DataType,
    pub(crate) animal_id: AnimalId,
    pub(crate) date: NaiveDate,
    pub(crate) value: Option<f64>,
    pub(crate) recorded_time: Option<NaiveDateTime>,
    pub(crate) entered_by: Option<String>,
    pub(crate) days_since_start: i64,
    pub(crate) group: GroupId,
}

impl Record {
    /// Create a record as parsed from a sheet, before the builder has
    /// established the time origin or group membership.
    #[must_use]
    pub fn new(
        data_type: DataType,
        animal_id: AnimalId,
        date: NaiveDate,
        value: Option<f64>,
        recorded_time: Option<NaiveDateTime>,
        entered_by: Option<String>,
    ) -> Self {
        let group = GroupId::Numeric(animal_id.group_prefix());
        Self {
            data_type,
            animal_id,
            date,
            value,
            recorded_time,
            entered_by,
            days_since_start: 0,
            group,
        }
    }

    /// Measurement kind.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Animal identifier.
    #[must_use]
    pub const fn animal_id(&self) -> &AnimalId {
        &self.animal_id
    }

    /// Calendar date of the measurement.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Measured value; absent for mortality rows, where the date itself
    /// carries the information.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        self.value
    }

    /// Wall-clock entry timestamp, informational.
    #[must_use]
    pub const fn recorded_time(&self) -> Option<NaiveDateTime> {
        self.recorded_time
    }

    /// Who entered the row, informational.
    #[must_use]
    pub fn entered_by(&self) -> Option<&str> {
        self.entered_by.as_deref()
    }

    /// Whole days between this record's date and the study start date.
    #[must_use]
    pub const fn days_since_start(&self) -> i64 {
        self.days_since_start
    }

    /// Group label (numeric prefix, or display name once renamed).
    #[must_use]
    pub const fn group(&self) -> &GroupId {
        &self.group
    }
}
