//! Study analyzer: dataset builder and group registry
//!
//! [`StudyAnalyzer`] owns the master longitudinal table. Construction
//! discovers the measurement sheets, parses them into one table,
//! validates identifiers, establishes the time origin, and derives group
//! membership. Afterwards the table is mutated in place only by start-date
//! changes and group renaming; everything else is a read query.

use crate::parse::{parse_sheet, RawRecord};
use crate::record::{AnimalId, DataType, GroupId, Record, ANIMAL_ID_PATTERN};
use crate::sheets::{SheetCatalog, BODYWEIGHT_SHEET, MORTALITY_SHEET};
use crate::workbook::{WorkbookSource, XlsxWorkbook};
use crate::{Error, Result};
use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Identifier-validation policy applied during construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Any malformed animal identifier fails the whole construction
    #[default]
    Strict,
    /// Malformed-identifier rows are dropped with a warning
    Lenient,
}

/// Construction options.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOptions {
    /// Identifier-validation policy
    pub strictness: Strictness,
    /// Numeric group identifiers to drop after group derivation
    pub exclude_groups: Vec<u32>,
}

impl AnalyzerOptions {
    /// Options with the default strict policy and no exclusions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the lenient identifier policy.
    #[must_use]
    pub const fn lenient(mut self) -> Self {
        self.strictness = Strictness::Lenient;
        self
    }

    /// Drop all records belonging to the given numeric groups.
    #[must_use]
    pub fn exclude_groups(mut self, groups: Vec<u32>) -> Self {
        self.exclude_groups = groups;
        self
    }
}

/// Per-group animal count, one entry per distinct group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    /// Group label
    pub group: GroupId,
    /// Count of distinct animals contributing records to the group
    pub num_animals: usize,
}

/// Analyzer over one study workbook's master table.
#[derive(Debug, Clone)]
pub struct StudyAnalyzer {
    records: Vec<Record>,
    study_start_date: NaiveDate,
    catalog: SheetCatalog,
}

impl StudyAnalyzer {
    /// Build an analyzer from a workbook file with default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file is missing, plus any
    /// construction error of [`Self::from_source`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, AnalyzerOptions::default())
    }

    /// Build an analyzer from a workbook file.
    ///
    /// # Errors
    ///
    /// See [`Self::open`] and [`Self::from_source`].
    pub fn open_with<P: AsRef<Path>>(path: P, options: AnalyzerOptions) -> Result<Self> {
        info!(path = %path.as_ref().display(), "loading study log");
        let mut workbook = XlsxWorkbook::open(path)?;
        Self::from_source(&mut workbook, options)
    }

    /// Build an analyzer from any workbook source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Workbook`] if a discovered sheet cannot be read or
    /// yields no records at all, [`Error::Parse`] on date/time coercion
    /// failure, and [`Error::Validation`] in strict mode when any animal
    /// identifier fails the `^\d+-\d+$` format.
    pub fn from_source<S: WorkbookSource>(source: &mut S, options: AnalyzerOptions) -> Result<Self> {
        let sheet_names = source.sheet_names();
        let catalog = SheetCatalog::locate(&sheet_names);

        if catalog.has_bodyweight {
            info!("found bodyweight data in sheet `{BODYWEIGHT_SHEET}`");
        }
        if catalog.has_mortality {
            info!("found mortality data in sheet `{MORTALITY_SHEET}`");
        }
        for sheet in &catalog.tumor_volume_sheets {
            info!("found tumor volume data in sheet `{sheet}`");
        }

        let mut raw: Vec<RawRecord> = Vec::new();
        if catalog.has_bodyweight {
            let table = source.read_sheet(BODYWEIGHT_SHEET)?;
            raw.extend(parse_sheet(&table, &DataType::Bodyweight)?);
        }
        if catalog.has_mortality {
            let table = source.read_sheet(MORTALITY_SHEET)?;
            raw.extend(parse_sheet(&table, &DataType::Mortality)?);
        }
        for sheet in &catalog.tumor_volume_sheets {
            let table = source.read_sheet(sheet)?;
            raw.extend(parse_sheet(&table, &DataType::TumorVolume(sheet.clone()))?);
        }

        let mut records = Self::validate_identifiers(raw, options.strictness)?;
        if records.is_empty() {
            return Err(Error::Workbook(
                "no measurement records found in any recognized sheet".to_string(),
            ));
        }

        // Time origin defaults to the earliest observed date.
        let study_start_date = records
            .iter()
            .map(Record::date)
            .min()
            .ok_or_else(|| Error::Workbook("empty master table".to_string()))?;
        info!(%study_start_date, "treating the earliest date in the data as the study start");

        for record in &mut records {
            record.days_since_start = (record.date - study_start_date).num_days();
        }

        // Stable sort: ties keep sheet order.
        records.sort_by_key(Record::days_since_start);

        if !options.exclude_groups.is_empty() {
            let before = records.len();
            records.retain(|r| !options.exclude_groups.contains(&r.animal_id.group_prefix()));
            info!(
                dropped = before - records.len(),
                excluded = ?options.exclude_groups,
                "applied group exclusion list"
            );
        }

        let analyzer = Self {
            records,
            study_start_date,
            catalog,
        };

        for summary in analyzer.groups_summary() {
            info!(
                group = %summary.group,
                animals = summary.num_animals,
                "found group"
            );
        }

        Ok(analyzer)
    }

    fn validate_identifiers(raw: Vec<RawRecord>, strictness: Strictness) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(raw.len());
        for row in raw {
            match AnimalId::parse(&row.animal_id) {
                Ok(id) => records.push(Record::new(
                    row.data_type,
                    id,
                    row.date,
                    row.value,
                    row.recorded_time,
                    row.entered_by,
                )),
                Err(err) => match strictness {
                    Strictness::Strict => return Err(err),
                    Strictness::Lenient => warn!(
                        animal_id = %row.animal_id,
                        pattern = ANIMAL_ID_PATTERN,
                        "dropping record with malformed animal ID"
                    ),
                },
            }
        }
        Ok(records)
    }

    /// Master table, sorted by `days_since_start` ascending.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Current study time origin.
    #[must_use]
    pub const fn study_start_date(&self) -> NaiveDate {
        self.study_start_date
    }

    /// Sheet classification recorded at construction.
    #[must_use]
    pub const fn sheet_catalog(&self) -> &SheetCatalog {
        &self.catalog
    }

    /// Distinct group labels, sorted ascending.
    #[must_use]
    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self
            .records
            .iter()
            .map(|r| r.group.clone())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        groups.sort();
        groups
    }

    /// Distinct measurement kinds present, in table order.
    #[must_use]
    pub fn data_types(&self) -> Vec<DataType> {
        let mut seen = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.data_type) {
                seen.push(record.data_type.clone());
            }
        }
        seen
    }

    /// Override the study start date and recompute every record's
    /// `days_since_start`. The table is neither re-sorted nor
    /// re-validated.
    pub fn set_study_start_date(&mut self, date: NaiveDate) {
        self.study_start_date = date;
        for record in &mut self.records {
            record.days_since_start = (record.date - date).num_days();
        }
    }

    /// Compatibility fallback accepting a `YYYY-MM-DD` string. Prefer
    /// [`Self::set_study_start_date`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the string is not a `YYYY-MM-DD` date.
    pub fn set_study_start_date_str(&mut self, date: &str) -> Result<()> {
        warn!(%date, "string start date accepted as a compatibility fallback; pass a NaiveDate instead");
        let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| Error::Parse(format!("cannot coerce `{date}` to a date: {e}")))?;
        self.set_study_start_date(parsed);
        Ok(())
    }

    /// Assign display names to the groups.
    ///
    /// The sorted distinct group labels are paired one-to-one with
    /// `names`, in the order given, and every record's group label is
    /// rewritten. Calling this again after a rename re-sorts the current
    /// (now textual) labels before pairing, which can silently reorder
    /// the mapping; assign final names in one call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cardinality`] if `names` does not match the
    /// number of distinct groups; the table is left untouched.
    pub fn set_group_names<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let groups = self.group_ids();
        if names.len() != groups.len() {
            return Err(Error::Cardinality {
                supplied: names.len(),
                expected: groups.len(),
            });
        }

        let mapping: FxHashMap<GroupId, GroupId> = groups
            .into_iter()
            .zip(names)
            .map(|(old, new)| {
                let new = GroupId::Named(new.as_ref().to_string());
                info!(from = %old, to = %new, "renaming group");
                (old, new)
            })
            .collect();

        for record in &mut self.records {
            if let Some(new) = mapping.get(&record.group) {
                record.group = new.clone();
            }
        }
        Ok(())
    }

    /// Count of distinct animals per group, sorted by group label
    /// ascending. Each animal counts once no matter how many measurement
    /// rows it contributes.
    #[must_use]
    pub fn groups_summary(&self) -> Vec<GroupSummary> {
        let mut by_group: BTreeMap<&GroupId, FxHashSet<&str>> = BTreeMap::new();
        for record in &self.records {
            by_group
                .entry(&record.group)
                .or_default()
                .insert(record.animal_id.as_str());
        }

        by_group
            .into_iter()
            .map(|(group, animals)| GroupSummary {
                group: group.clone(),
                num_animals: animals.len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::CANONICAL_COLUMNS;
    use crate::workbook::{Cell, MemoryWorkbook, SheetTable};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(id: &str, day: u32, value: Option<f64>) -> Vec<Cell> {
        vec![
            Cell::Text(id.into()),
            Cell::Text(format!("2025-03-{day:02}")),
            value.map_or(Cell::Empty, Cell::Number),
            Cell::Empty,
            Cell::Empty,
        ]
    }

    fn sheet(name: &str, rows: Vec<Vec<Cell>>) -> SheetTable {
        SheetTable::new(
            name,
            CANONICAL_COLUMNS.iter().map(ToString::to_string).collect(),
            rows,
        )
    }

    fn workbook() -> MemoryWorkbook {
        MemoryWorkbook::new()
            .with_sheet(sheet(
                "Data BW",
                vec![
                    row("1-1", 1, Some(21.0)),
                    row("1-2", 1, Some(20.5)),
                    row("2-1", 2, Some(22.0)),
                    row("1-1", 8, Some(20.1)),
                ],
            ))
            .with_sheet(sheet("Data MO", vec![row("1-1", 6, None)]))
    }

    #[test]
    fn test_construction_sets_origin_and_days() {
        let analyzer =
            StudyAnalyzer::from_source(&mut workbook(), AnalyzerOptions::default()).unwrap();

        assert_eq!(analyzer.study_start_date(), date(2025, 3, 1));
        let days: Vec<i64> = analyzer
            .records()
            .iter()
            .map(Record::days_since_start)
            .collect();
        assert_eq!(days, vec![0, 0, 1, 5, 7]);
    }

    #[test]
    fn test_missing_bw_and_mo_sheets_is_not_an_error() {
        let mut wb = MemoryWorkbook::new().with_sheet(sheet(
            "Data TV",
            vec![row("1-1", 1, Some(50.0))],
        ));
        let analyzer = StudyAnalyzer::from_source(&mut wb, AnalyzerOptions::default()).unwrap();
        assert_eq!(analyzer.records().len(), 1);
        assert_eq!(
            analyzer.data_types(),
            vec![DataType::TumorVolume("Data TV".into())]
        );
    }

    #[test]
    fn test_empty_workbook_fails() {
        let mut wb = MemoryWorkbook::new();
        let err = StudyAnalyzer::from_source(&mut wb, AnalyzerOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Workbook(_)));
    }

    #[test]
    fn test_strict_mode_rejects_malformed_id() {
        let mut wb = MemoryWorkbook::new().with_sheet(sheet(
            "Data BW",
            vec![row("1-1", 1, Some(21.0)), row("cage-7", 1, Some(19.0))],
        ));
        let err = StudyAnalyzer::from_source(&mut wb, AnalyzerOptions::default()).unwrap_err();
        match err {
            Error::Validation { value, pattern } => {
                assert_eq!(value, "cage-7");
                assert_eq!(pattern, ANIMAL_ID_PATTERN);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_lenient_mode_drops_only_malformed() {
        let mut wb = MemoryWorkbook::new().with_sheet(sheet(
            "Data BW",
            vec![
                row("1-1", 1, Some(21.0)),
                row("cage-7", 1, Some(19.0)),
                row("2-1", 2, Some(22.0)),
            ],
        ));
        let analyzer =
            StudyAnalyzer::from_source(&mut wb, AnalyzerOptions::new().lenient()).unwrap();
        assert_eq!(analyzer.records().len(), 2);
        assert!(analyzer
            .records()
            .iter()
            .all(|r| AnimalId::is_valid(r.animal_id().as_str())));
    }

    #[test]
    fn test_group_exclusion_applies_after_derivation() {
        let analyzer = StudyAnalyzer::from_source(
            &mut workbook(),
            AnalyzerOptions::new().exclude_groups(vec![2]),
        )
        .unwrap();
        assert_eq!(analyzer.group_ids(), vec![GroupId::Numeric(1)]);
        // Start date still derives from the full post-validation table.
        assert_eq!(analyzer.study_start_date(), date(2025, 3, 1));
    }

    #[test]
    fn test_set_study_start_date_recomputes_without_resorting() {
        let mut analyzer =
            StudyAnalyzer::from_source(&mut workbook(), AnalyzerOptions::default()).unwrap();
        let order_before: Vec<String> = analyzer
            .records()
            .iter()
            .map(|r| r.animal_id().to_string())
            .collect();

        analyzer.set_study_start_date(date(2025, 3, 8));
        for record in analyzer.records() {
            assert_eq!(
                record.days_since_start(),
                (record.date() - date(2025, 3, 8)).num_days()
            );
        }
        let order_after: Vec<String> = analyzer
            .records()
            .iter()
            .map(|r| r.animal_id().to_string())
            .collect();
        assert_eq!(order_before, order_after);
    }

    #[test]
    fn test_set_study_start_date_str_fallback() {
        let mut analyzer =
            StudyAnalyzer::from_source(&mut workbook(), AnalyzerOptions::default()).unwrap();
        analyzer.set_study_start_date_str("2025-03-02").unwrap();
        assert_eq!(analyzer.study_start_date(), date(2025, 3, 2));
        assert!(analyzer.set_study_start_date_str("03/02/2025").is_err());
    }

    #[test]
    fn test_set_group_names_bijection() {
        let mut analyzer =
            StudyAnalyzer::from_source(&mut workbook(), AnalyzerOptions::default()).unwrap();
        analyzer.set_group_names(&["Control", "Treated"]).unwrap();

        let summary = analyzer.groups_summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].group, GroupId::from("Control"));
        assert_eq!(summary[0].num_animals, 2);
        assert_eq!(summary[1].group, GroupId::from("Treated"));
        assert_eq!(summary[1].num_animals, 1);
    }

    #[test]
    fn test_set_group_names_cardinality_never_partially_mutates() {
        let mut analyzer =
            StudyAnalyzer::from_source(&mut workbook(), AnalyzerOptions::default()).unwrap();
        let before = analyzer.group_ids();

        let err = analyzer.set_group_names(&["Only One"]).unwrap_err();
        assert!(matches!(
            err,
            Error::Cardinality {
                supplied: 1,
                expected: 2
            }
        ));
        assert_eq!(analyzer.group_ids(), before);
    }

    #[test]
    fn test_groups_summary_counts_animals_not_rows() {
        // Animal 1-1 contributes three rows (two BW, one MO) but counts once.
        let analyzer =
            StudyAnalyzer::from_source(&mut workbook(), AnalyzerOptions::default()).unwrap();
        let summary = analyzer.groups_summary();
        assert_eq!(summary[0].group, GroupId::Numeric(1));
        assert_eq!(summary[0].num_animals, 2);
        assert_eq!(summary[1].num_animals, 1);
    }

    #[test]
    fn test_repeated_rename_sorts_current_labels() {
        let mut analyzer =
            StudyAnalyzer::from_source(&mut workbook(), AnalyzerOptions::default()).unwrap();
        analyzer.set_group_names(&["Zeta", "Alpha"]).unwrap();
        // Second rename pairs against ["Alpha", "Zeta"] (lexicographic),
        // so the original group 2 ("Alpha") now receives the first name.
        analyzer.set_group_names(&["First", "Second"]).unwrap();

        let summary = analyzer.groups_summary();
        assert_eq!(summary[0].group, GroupId::from("First"));
        assert_eq!(summary[0].num_animals, 1); // was group 2
        assert_eq!(summary[1].group, GroupId::from("Second"));
        assert_eq!(summary[1].num_animals, 2); // was group 1
    }
}
