//! Aggregation engine
//!
//! Read queries over the master table: survival series per group and
//! per-timepoint measurement statistics. Survival counts are computed via
//! a per-animal death-day index; the result is identical to scanning the
//! mortality rows for every (group, timepoint, animal) triple.

use crate::analyzer::StudyAnalyzer;
use crate::record::{AnimalId, DataType, GroupId};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// Survival curve for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalCurve {
    /// Group label
    pub group: GroupId,
    /// Distinct animals in the group
    pub group_size: usize,
    /// One point per timepoint in the union axis, day ascending
    pub points: Vec<SurvivalPoint>,
}

/// Surviving animals in one group at one timepoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurvivalPoint {
    /// Days since study start
    pub day: i64,
    /// Surviving count, or surviving fraction of the group in
    /// fractional mode
    pub value: f64,
}

/// Mean and spread of one group's measurements at one timepoint.
///
/// `std_dev` is the sample standard deviation (N−1 denominator) and is
/// `None` for a single observation; `std_err` is `std_dev / √N`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatPoint {
    /// Days since study start
    pub day: i64,
    /// Mean of the partition
    pub mean: f64,
    /// Sample standard deviation, `None` when fewer than two observations
    pub std_dev: Option<f64>,
    /// Standard error of the mean, `None` when fewer than two observations
    pub std_err: Option<f64>,
    /// Observations in the partition
    pub n: usize,
}

/// Per-timepoint statistics for one group and one measurement kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSeries {
    /// Group label
    pub group: GroupId,
    /// One point per timepoint with data, day ascending
    pub points: Vec<StatPoint>,
}

/// Longitudinal trace of one animal for one measurement kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimalTrace {
    /// The animal
    pub animal: AnimalId,
    /// `(day, value)` pairs in chronological order
    pub points: Vec<(i64, f64)>,
}

/// One facet panel: a group's individual traces plus its mean trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetPanel {
    /// Group label
    pub group: GroupId,
    /// Per-animal traces
    pub traces: Vec<AnimalTrace>,
    /// Per-day mean across the group's observations
    pub mean: Vec<(i64, f64)>,
}

/// Facet panels for every group, with an optional shared control overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetedView {
    /// One panel per non-control group, sorted by group label
    pub panels: Vec<FacetPanel>,
    /// Control group overlay drawn into every panel, if requested
    pub control: Option<FacetPanel>,
}

impl StudyAnalyzer {
    /// Per-animal death day: the earliest mortality record for each
    /// animal, keyed by identifier.
    fn death_day_index(&self) -> FxHashMap<&str, i64> {
        let mut deaths: FxHashMap<&str, i64> = FxHashMap::default();
        for record in self.records() {
            if *record.data_type() == DataType::Mortality {
                let day = record.days_since_start();
                deaths
                    .entry(record.animal_id().as_str())
                    .and_modify(|d| *d = (*d).min(day))
                    .or_insert(day);
            }
        }
        deaths
    }

    /// Survival series for every group over the union timepoint axis:
    /// every distinct `days_since_start` value anywhere in the table,
    /// regardless of group or measurement kind.
    ///
    /// An animal is dead as of timepoint `T` once any of its mortality
    /// records has `days_since_start <= T`. In fractional mode each count
    /// is divided by the group's distinct-animal total.
    #[must_use]
    pub fn survival_series(&self, fractional: bool) -> Vec<SurvivalCurve> {
        let deaths = self.death_day_index();
        let timepoints: BTreeSet<i64> = self
            .records()
            .iter()
            .map(crate::record::Record::days_since_start)
            .collect();

        self.group_ids()
            .into_iter()
            .map(|group| {
                let animals: BTreeSet<&str> = self
                    .records()
                    .iter()
                    .filter(|r| *r.group() == group)
                    .map(|r| r.animal_id().as_str())
                    .collect();

                let points = timepoints
                    .iter()
                    .map(|&day| {
                        let alive = animals
                            .iter()
                            .filter(|a| deaths.get(*a).map_or(true, |&d| d > day))
                            .count();
                        #[allow(clippy::cast_precision_loss)]
                        let value = if fractional {
                            alive as f64 / animals.len() as f64
                        } else {
                            alive as f64
                        };
                        SurvivalPoint { day, value }
                    })
                    .collect();

                SurvivalCurve {
                    group,
                    group_size: animals.len(),
                    points,
                }
            })
            .collect()
    }

    /// First chronological value per animal for a measurement kind, used
    /// as the normalization denominator. Table order is chronological.
    fn first_value_index(&self, data_type: &DataType) -> FxHashMap<&str, f64> {
        let mut firsts: FxHashMap<&str, f64> = FxHashMap::default();
        for record in self.records() {
            if record.data_type() == data_type {
                if let Some(value) = record.value() {
                    firsts.entry(record.animal_id().as_str()).or_insert(value);
                }
            }
        }
        firsts
    }

    /// Mean, sample standard deviation, and standard error per
    /// `(group, day)` partition for one measurement kind. Records without
    /// a value are skipped. With `normalize` set, every value is first
    /// divided by its animal's first chronological value for the kind;
    /// the division is unguarded, so a zero first value propagates IEEE
    /// infinities/NaNs into the partition.
    ///
    /// A kind with no matching records yields an empty vector.
    #[must_use]
    pub fn grouped_stats(&self, data_type: &DataType, normalize: bool) -> Vec<GroupSeries> {
        let firsts = if normalize {
            self.first_value_index(data_type)
        } else {
            FxHashMap::default()
        };

        // BTreeMap keys keep groups and days sorted.
        let mut partitions: std::collections::BTreeMap<(GroupId, i64), Vec<f64>> =
            std::collections::BTreeMap::new();
        for record in self.records() {
            if record.data_type() != data_type {
                continue;
            }
            let Some(mut value) = record.value() else {
                continue;
            };
            if normalize {
                if let Some(first) = firsts.get(record.animal_id().as_str()) {
                    value /= first;
                }
            }
            partitions
                .entry((record.group().clone(), record.days_since_start()))
                .or_default()
                .push(value);
        }

        let mut series: Vec<GroupSeries> = Vec::new();
        for ((group, day), values) in partitions {
            let point = stat_point(day, &values);
            if let Some(last) = series.last_mut() {
                if last.group == group {
                    last.points.push(point);
                    continue;
                }
            }
            series.push(GroupSeries {
                group,
                points: vec![point],
            });
        }
        series
    }

    /// Per-group facet data for one measurement kind: individual animal
    /// traces and a per-day mean trace per group, with an optional shared
    /// control-group overlay. The control group is removed from the
    /// panels; its own traces are included only when
    /// `traces_for_control` is set (the mean overlay is always present).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] if no records match the measurement
    /// kind, or if `control` names a group absent from the matching
    /// records.
    pub fn faceted_view(
        &self,
        data_type: &DataType,
        control: Option<&GroupId>,
        traces_for_control: bool,
    ) -> Result<FacetedView> {
        let mut groups: Vec<GroupId> = BTreeSet::from_iter(
            self.records()
                .iter()
                .filter(|r| r.data_type() == data_type)
                .map(|r| r.group().clone()),
        )
        .into_iter()
        .collect();

        if groups.is_empty() {
            return Err(Error::Lookup(format!(
                "no records of type `{data_type}` in the dataset"
            )));
        }

        let control_panel = if let Some(control) = control {
            if !groups.contains(control) {
                return Err(Error::Lookup(format!(
                    "control group ID `{control}` not found in the data"
                )));
            }
            groups.retain(|g| g != control);
            let mut panel = self.facet_panel(data_type, control);
            if !traces_for_control {
                panel.traces.clear();
            }
            Some(panel)
        } else {
            None
        };

        let panels = groups
            .iter()
            .map(|group| self.facet_panel(data_type, group))
            .collect();

        Ok(FacetedView {
            panels,
            control: control_panel,
        })
    }

    fn facet_panel(&self, data_type: &DataType, group: &GroupId) -> FacetPanel {
        let mut traces: Vec<AnimalTrace> = Vec::new();
        let mut by_day: std::collections::BTreeMap<i64, Vec<f64>> =
            std::collections::BTreeMap::new();

        for record in self.records() {
            if record.data_type() != data_type || record.group() != group {
                continue;
            }
            let Some(value) = record.value() else {
                continue;
            };
            let day = record.days_since_start();
            by_day.entry(day).or_default().push(value);

            match traces.iter_mut().find(|t| &t.animal == record.animal_id()) {
                Some(trace) => trace.points.push((day, value)),
                None => traces.push(AnimalTrace {
                    animal: record.animal_id().clone(),
                    points: vec![(day, value)],
                }),
            }
        }

        let mean = by_day
            .into_iter()
            .map(|(day, values)| (day, mean_of(&values)))
            .collect();

        FacetPanel {
            group: group.clone(),
            traces,
            mean,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[allow(clippy::cast_precision_loss)]
fn stat_point(day: i64, values: &[f64]) -> StatPoint {
    let n = values.len();
    let mean = mean_of(values);
    let (std_dev, std_err) = if n > 1 {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
        let sd = variance.sqrt();
        (Some(sd), Some(sd / (n as f64).sqrt()))
    } else {
        (None, None)
    };

    StatPoint {
        day,
        mean,
        std_dev,
        std_err,
        n,
    }
}
