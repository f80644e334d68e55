// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! Time-bucketed statistic records, and in-memory implementations of the
//! provider traits for hosts (and tests) that already hold all series as
//! plain data.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::{StatisticLabeler, StatisticsSource};

/// One bucket of a statistic series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatisticValue {
    /// The start of the bucket's time interval.
    pub start: DateTime<Utc>,

    /// The energy delta recorded for this bucket, in kWh.  Absent values are
    /// treated as zero by every computation in this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

/// A complete in-memory statistics snapshot, keyed by statistic id.
///
/// Each push from the statistics collaborator fully replaces the previous
/// snapshot; there is no merging of partial data.
#[derive(Clone, Debug, Default)]
pub struct StatisticsSnapshot {
    series: HashMap<String, Vec<StatisticValue>>,
}

impl StatisticsSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a series for the given statistic id, replacing any previous
    /// series under that id.
    pub fn insert(&mut self, stat_id: impl Into<String>, values: Vec<StatisticValue>) {
        self.series.insert(stat_id.into(), values);
    }
}

impl StatisticsSource for StatisticsSnapshot {
    fn series(&self, stat_id: &str) -> Option<&[StatisticValue]> {
        self.series.get(stat_id).map(Vec::as_slice)
    }

    fn sum_growth(&self, stat_ids: &[&str]) -> Option<f64> {
        let mut total = None;
        for stat_id in stat_ids {
            if let Some(values) = self.series.get(*stat_id) {
                let growth: f64 = values.iter().filter_map(|value| value.change).sum();
                *total.get_or_insert(0.0) += growth;
            }
        }
        total
    }
}

/// A fixed statistic id to display label mapping.
#[derive(Clone, Debug, Default)]
pub struct StaticLabels {
    labels: HashMap<String, String>,
}

impl StaticLabels {
    /// Creates an empty label mapping.  Useful as a stand-in when no labeling
    /// collaborator is available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label for the given statistic id.
    pub fn insert(&mut self, stat_id: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(stat_id.into(), label.into());
    }
}

impl StatisticLabeler for StaticLabels {
    fn label(&self, stat_id: &str) -> Option<String> {
        self.labels.get(stat_id).cloned()
    }
}
