//! Integration tests for the calamine-backed workbook reader
//!
//! Fabricates real xlsx study logs with `rust_xlsxwriter` (five banner
//! rows above the header, stray helper columns) and runs them through the
//! full construction pipeline.

use invivo::{AnalyzerOptions, Error, GroupId, StudyAnalyzer};
use rust_xlsxwriter::Workbook;
use std::path::Path;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Write one measurement sheet in the study-log layout: a banner in the
/// first five rows, the canonical header in row 5, data below, plus a
/// `Notes` helper column and a header-only column.
fn write_sheet(
    workbook: &mut Workbook,
    name: &str,
    rows: &[(&str, &str, Option<f64>)],
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let sheet = workbook.add_worksheet().set_name(name)?;
    sheet.write_string(0, 0, "In Vivo Study Log")?;
    sheet.write_string(1, 0, "Exported 2025-06-20")?;

    for (col, label) in ["Animal ID", "Date", "Value", "Recorded Time", "Entered by", "Notes", "Unused"]
        .iter()
        .enumerate()
    {
        sheet.write_string(5, u16::try_from(col).unwrap(), *label)?;
    }

    for (i, (id, date, value)) in rows.iter().enumerate() {
        let row = u32::try_from(i).unwrap() + 6;
        sheet.write_string(row, 0, *id)?;
        sheet.write_string(row, 1, *date)?;
        if let Some(v) = value {
            sheet.write_number(row, 2, *v)?;
        }
        sheet.write_string(row, 3, &format!("{date} 08:00:00"))?;
        sheet.write_string(row, 4, "hkb")?;
        sheet.write_string(row, 5, "scribble")?;
    }
    Ok(())
}

fn write_example_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let mut bw = Vec::new();
    for id in ["1-1", "1-2", "2-1"] {
        for date in ["2025-06-01", "2025-06-06", "2025-06-11"] {
            bw.push((id, date, Some(20.0)));
        }
    }
    write_sheet(&mut workbook, "Data BW", &bw).unwrap();
    // Mortality sheets carry a nominal value; only the date matters.
    write_sheet(&mut workbook, "Data MO", &[("1-1", "2025-06-06", Some(1.0))]).unwrap();
    write_sheet(&mut workbook, "Data TV Flank", &[("1-1", "2025-06-11", Some(130.0))]).unwrap();
    workbook.save(path).unwrap();
}

#[test]
fn open_full_study_log() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study_log.xlsx");
    write_example_workbook(&path);

    let analyzer = StudyAnalyzer::open(&path).unwrap();

    let catalog = analyzer.sheet_catalog();
    assert!(catalog.has_bodyweight);
    assert!(catalog.has_mortality);
    assert_eq!(catalog.tumor_volume_sheets, vec!["Data TV Flank".to_string()]);

    // 9 bodyweight + 1 mortality + 1 tumor volume rows
    assert_eq!(analyzer.records().len(), 11);

    let summary = analyzer.groups_summary();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].num_animals, 2);
    assert_eq!(summary[1].num_animals, 1);
}

#[test]
fn survival_from_disk_matches_worked_example() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study_log.xlsx");
    write_example_workbook(&path);

    let analyzer = StudyAnalyzer::open(&path).unwrap();
    let curves = analyzer.survival_series(false);
    let g1 = curves
        .iter()
        .find(|c| c.group == GroupId::Numeric(1))
        .unwrap();

    let at = |day: i64| g1.points.iter().find(|p| p.day == day).unwrap().value;
    assert_eq!(at(0), 2.0);
    assert_eq!(at(5), 1.0);
    assert_eq!(at(10), 1.0);
}

#[test]
fn helper_columns_are_dropped() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study_log.xlsx");
    write_example_workbook(&path);

    let analyzer = StudyAnalyzer::open(&path).unwrap();
    // The Notes column never reaches the record schema; Entered by does.
    for record in analyzer.records() {
        assert_ne!(record.entered_by(), Some("scribble"));
    }
    assert!(analyzer
        .records()
        .iter()
        .any(|r| r.entered_by() == Some("hkb")));
}

#[test]
fn missing_file_is_not_found() {
    let err = StudyAnalyzer::open("/does/not/exist.xlsx").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn options_apply_to_disk_loads() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study_log.xlsx");
    write_example_workbook(&path);

    let analyzer =
        StudyAnalyzer::open_with(&path, AnalyzerOptions::new().exclude_groups(vec![2])).unwrap();
    assert_eq!(analyzer.group_ids(), vec![GroupId::Numeric(1)]);
}
