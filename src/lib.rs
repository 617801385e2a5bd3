//! # invivo: longitudinal analysis of in-vivo study logs
//!
//! Ingests animal-study measurement sheets (bodyweight, mortality, tumor
//! volume) from spreadsheet workbooks, normalizes them into one master
//! longitudinal table keyed by animal and group, and computes the
//! descriptive series every downstream view draws: survival curves,
//! grouped time-series with error bands, and per-group facet panels with
//! an optional control overlay.
//!
//! Rendering is out of scope: the `chart` module produces series of
//! points with styling hints, nothing more. Workbook decoding sits behind
//! the [`workbook::WorkbookSource`] trait, with a calamine-backed xlsx
//! implementation provided.
//!
//! ## Example
//!
//! ```rust,no_run
//! use invivo::StudyAnalyzer;
//!
//! let mut analyzer = StudyAnalyzer::open("study_log.xlsx")?;
//! analyzer.set_group_names(&["Control", "Treated"])?;
//!
//! for summary in analyzer.groups_summary() {
//!     println!("{}: {} animals", summary.group, summary.num_animals);
//! }
//!
//! let survival = analyzer.survival_chart(true);
//! println!("{} survival curves", survival.series.len());
//! # Ok::<(), invivo::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod analyzer;
pub mod chart;
pub mod error;
pub mod parse;
pub mod record;
pub mod sheets;
pub mod workbook;

pub use aggregate::{FacetedView, GroupSeries, StatPoint, SurvivalCurve, SurvivalPoint};
pub use analyzer::{AnalyzerOptions, GroupSummary, Strictness, StudyAnalyzer};
pub use chart::{ChartSpec, ErrorBand, FacetedChartSpec};
pub use error::{Error, Result};
pub use record::{AnimalId, DataType, GroupId, Record};
pub use sheets::SheetCatalog;
