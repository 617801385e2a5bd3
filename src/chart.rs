//! Chart data for the external view layer
//!
//! The analyzer computes what to draw, never how pixels are produced: a
//! [`ChartSpec`] is a set of labelled series and error bands with styling
//! hints, consumed by whatever renderer the caller wires up.

use crate::aggregate::FacetPanel;
use crate::analyzer::StudyAnalyzer;
use crate::record::{DataType, GroupId};
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;

/// Which spread statistic an error band shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorBand {
    /// Mean ± sample standard deviation
    StdDev,
    /// Mean ± standard error of the mean
    StdErr,
}

/// One drawable point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Days since study start
    pub x: f64,
    /// Measurement (or survival) value
    pub y: f64,
}

/// Line styling hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    /// Draw as a post-step function instead of a straight line
    pub step_post: bool,
    /// Line width
    pub width: f32,
    /// Opacity in `[0, 1]`
    pub alpha: f32,
    /// Color hint, renderer-defined palette when `None`
    pub color: Option<String>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            step_post: false,
            width: 2.0,
            alpha: 1.0,
            color: None,
        }
    }
}

/// One labelled series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    /// Legend label
    pub label: String,
    /// Points in x order
    pub points: Vec<Point>,
    /// Styling hints
    pub style: LineStyle,
}

/// One vertical slice of an error band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandPoint {
    /// Days since study start
    pub x: f64,
    /// Band lower edge
    pub lower: f64,
    /// Band upper edge
    pub upper: f64,
}

/// Shaded error band around a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    /// Label of the series the band belongs to
    pub label: String,
    /// Fill opacity
    pub alpha: f32,
    /// Band edges in x order
    pub points: Vec<BandPoint>,
}

/// Everything the view layer needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Chart title
    pub title: String,
    /// X-axis label
    pub x_label: String,
    /// Y-axis label
    pub y_label: String,
    /// Lower y-axis bound, if pinned
    pub y_min: Option<f64>,
    /// Series to draw
    pub series: Vec<Series>,
    /// Error bands to draw underneath the series
    pub bands: Vec<Band>,
    /// Vertical reference markers, as day offsets from the study start
    pub reference_days: Vec<i64>,
}

/// One chart per group, sharing axes, with an optional control overlay
/// repeated in every panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetedChartSpec {
    /// One panel per non-control group
    pub panels: Vec<ChartSpec>,
    /// Panels share x and y axes
    pub shared_axes: bool,
}

const TRACE_ALPHA: f32 = 0.1;
const MEAN_ALPHA: f32 = 0.7;
const BAND_ALPHA: f32 = 0.1;

impl StudyAnalyzer {
    /// Survival step chart: one post-step series per group.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn survival_chart(&self, fractional: bool) -> ChartSpec {
        let series = self
            .survival_series(fractional)
            .into_iter()
            .map(|curve| Series {
                label: curve.group.to_string(),
                points: curve
                    .points
                    .iter()
                    .map(|p| Point {
                        x: p.day as f64,
                        y: p.value,
                    })
                    .collect(),
                style: LineStyle {
                    step_post: true,
                    ..LineStyle::default()
                },
            })
            .collect();

        ChartSpec {
            title: "Survival".to_string(),
            x_label: "Days Since Study Start".to_string(),
            y_label: if fractional {
                "Fraction Surviving".to_string()
            } else {
                "N Surviving".to_string()
            },
            y_min: Some(0.0),
            series,
            bands: Vec::new(),
            reference_days: Vec::new(),
        }
    }

    /// Grouped time-series chart: per-group mean lines with the chosen
    /// error band. Band slices with an undefined spread (single
    /// observation) are omitted. `reference_dates` become vertical
    /// markers at their day offsets from the current study start.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn grouped_chart(
        &self,
        data_type: &DataType,
        band: ErrorBand,
        normalize: bool,
        reference_dates: &[NaiveDate],
    ) -> ChartSpec {
        let mut series = Vec::new();
        let mut bands = Vec::new();

        for group_series in self.grouped_stats(data_type, normalize) {
            let label = format!("({})", group_series.group);

            let points = group_series
                .points
                .iter()
                .map(|p| Point {
                    x: p.day as f64,
                    y: p.mean,
                })
                .collect();

            let band_points = group_series
                .points
                .iter()
                .filter_map(|p| {
                    let spread = match band {
                        ErrorBand::StdDev => p.std_dev,
                        ErrorBand::StdErr => p.std_err,
                    }?;
                    Some(BandPoint {
                        x: p.day as f64,
                        lower: p.mean - spread,
                        upper: p.mean + spread,
                    })
                })
                .collect();

            series.push(Series {
                label: label.clone(),
                points,
                style: LineStyle {
                    width: 4.0,
                    ..LineStyle::default()
                },
            });
            bands.push(Band {
                label,
                alpha: BAND_ALPHA,
                points: band_points,
            });
        }

        let reference_days = reference_dates
            .iter()
            .map(|d| (*d - self.study_start_date()).num_days())
            .collect();

        ChartSpec {
            title: format!("{data_type} by Group"),
            x_label: "Days Since Start".to_string(),
            y_label: data_type.to_string(),
            y_min: None,
            series,
            bands,
            reference_days,
        }
    }

    /// Per-group facet panels: faint individual traces under a bold mean
    /// trace, with the control group (if any) overlaid in black on every
    /// panel instead of getting a panel of its own.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Lookup`](crate::Error::Lookup) from
    /// [`Self::faceted_view`] for an unknown measurement kind or control
    /// group.
    pub fn faceted_chart(
        &self,
        data_type: &DataType,
        control: Option<&GroupId>,
        traces_for_control: bool,
    ) -> Result<FacetedChartSpec> {
        let view = self.faceted_view(data_type, control, traces_for_control)?;

        let panels = view
            .panels
            .iter()
            .map(|panel| {
                let mut series = Vec::new();
                if let Some(control) = &view.control {
                    push_panel_series(&mut series, control, "black");
                }
                push_panel_series(&mut series, panel, "red");

                ChartSpec {
                    title: panel.group.to_string(),
                    x_label: "Days Since Start".to_string(),
                    y_label: data_type.to_string(),
                    y_min: None,
                    series,
                    bands: Vec::new(),
                    reference_days: Vec::new(),
                }
            })
            .collect();

        Ok(FacetedChartSpec {
            panels,
            shared_axes: true,
        })
    }
}

/// Append a panel's individual traces and mean trace in one color.
#[allow(clippy::cast_precision_loss)]
fn push_panel_series(series: &mut Vec<Series>, panel: &FacetPanel, color: &str) {
    let to_points = |points: &[(i64, f64)]| -> Vec<Point> {
        points
            .iter()
            .map(|&(d, v)| Point { x: d as f64, y: v })
            .collect()
    };

    for trace in &panel.traces {
        series.push(Series {
            label: trace.animal.to_string(),
            points: to_points(&trace.points),
            style: LineStyle {
                width: 1.0,
                alpha: TRACE_ALPHA,
                color: Some(color.to_string()),
                ..LineStyle::default()
            },
        });
    }

    series.push(Series {
        label: panel.group.to_string(),
        points: to_points(&panel.mean),
        style: LineStyle {
            width: 2.0,
            alpha: MEAN_ALPHA,
            color: Some(color.to_string()),
            ..LineStyle::default()
        },
    });
}
