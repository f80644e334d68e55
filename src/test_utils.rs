// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! This module is only compiled when running unit tests and contains fixture
//! helpers that are shared by the test modules across the crate:
//!
//! - builders for statistic series and for source/consumer declarations.
//! - an approximate equality assertion for energy magnitudes.

use chrono::{Duration, TimeZone, Utc};

use crate::preferences::{
    ConsumerPreference, EnergyPreferences, EnergySource, GridFlowFrom, GridFlowTo,
};
use crate::statistics::StatisticValue;

/// Builds an hourly series from the given bucket deltas, starting at a fixed
/// reference time.
pub(crate) fn hourly_series(changes: &[Option<f64>]) -> Vec<StatisticValue> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    changes
        .iter()
        .enumerate()
        .map(|(i, change)| StatisticValue {
            start: start + Duration::hours(i as i64),
            change: *change,
        })
        .collect()
}

/// Builds an hourly series where every bucket has a delta.
pub(crate) fn series(changes: &[f64]) -> Vec<StatisticValue> {
    hourly_series(&changes.iter().copied().map(Some).collect::<Vec<_>>())
}

pub(crate) fn grid_source(flow_from: &[&str], flow_to: &[&str]) -> EnergySource {
    EnergySource::Grid {
        flow_from: flow_from
            .iter()
            .map(|id| GridFlowFrom {
                stat_energy_from: (*id).to_owned(),
            })
            .collect(),
        flow_to: flow_to
            .iter()
            .map(|id| GridFlowTo {
                stat_energy_to: (*id).to_owned(),
            })
            .collect(),
    }
}

pub(crate) fn solar_source(stat_energy_from: &str) -> EnergySource {
    EnergySource::Solar {
        stat_energy_from: stat_energy_from.to_owned(),
    }
}

pub(crate) fn battery_source(stat_energy_from: &str, stat_energy_to: &str) -> EnergySource {
    EnergySource::Battery {
        stat_energy_from: stat_energy_from.to_owned(),
        stat_energy_to: stat_energy_to.to_owned(),
    }
}

pub(crate) fn consumer(stat_consumption: &str) -> ConsumerPreference {
    ConsumerPreference {
        stat_consumption: stat_consumption.to_owned(),
        name: None,
        included_in_stat: None,
    }
}

pub(crate) fn named_consumer(stat_consumption: &str, name: &str) -> ConsumerPreference {
    ConsumerPreference {
        name: Some(name.to_owned()),
        ..consumer(stat_consumption)
    }
}

pub(crate) fn consumer_included_in(stat_consumption: &str, rollup: &str) -> ConsumerPreference {
    ConsumerPreference {
        included_in_stat: Some(rollup.to_owned()),
        ..consumer(stat_consumption)
    }
}

/// Builds validated preferences, panicking on invalid test input.
pub(crate) fn prefs(
    sources: Vec<EnergySource>,
    consumers: Vec<ConsumerPreference>,
) -> EnergyPreferences {
    EnergyPreferences::try_new(sources, consumers).unwrap()
}

/// Asserts that two energy magnitudes are equal up to float rounding.
pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
