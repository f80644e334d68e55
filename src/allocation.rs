// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! Source-mix calculation and proportional consumer allocation.
//!
//! For every time bucket, [`compute_source_mix`] sums how much energy entered
//! the system from generation, battery discharge and grid import.
//! [`allocate_consumers`] then splits each consumer's measured draw across
//! those three categories, in proportion to the bucket's global mix.
//!
//! The proportional split is a deliberate approximation: it assumes every
//! consumer draws from the instantaneous whole-system mix uniformly.  There
//! is no per-device source metering to attribute against, so this is a
//! statistical proxy, not a measurement.

use std::collections::BTreeMap;

use crate::preferences::{exclusion_set, ConsumerPreference, EnergyPreferences, EnergySource};
use crate::providers::StatisticsSource;

/// Energy attributed to each source category for one time bucket, in kWh.
///
/// All three magnitudes are non-negative.  Their sum is not required to equal
/// the total consumption of the bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyAllocation {
    /// Energy from solar generation.
    pub from_gen: f64,
    /// Energy from battery discharge.
    pub from_batt: f64,
    /// Energy imported from the grid.
    pub from_grid: f64,
}

impl EnergyAllocation {
    /// Returns the total energy across all three categories.
    pub fn total(&self) -> f64 {
        self.from_gen + self.from_batt + self.from_grid
    }

    /// Returns the fractional contribution of (generation, battery, grid) to
    /// this bucket's total.
    ///
    /// When the total is zero, all three ratios are zero, so a bucket without
    /// any source energy contributes nothing to any consumer.
    pub fn ratios(&self) -> (f64, f64, f64) {
        let total = self.total();
        if total > 0.0 {
            (
                self.from_gen / total,
                self.from_batt / total,
                self.from_grid / total,
            )
        } else {
            (0.0, 0.0, 0.0)
        }
    }
}

/// Returns the statistic delta for the given bucket index, or zero when the
/// series, the bucket or the value is absent.
fn change_at(stats: &impl StatisticsSource, stat_id: &str, index: usize) -> f64 {
    stats
        .series(stat_id)
        .and_then(|series| series.get(index))
        .and_then(|value| value.change)
        .unwrap_or(0.0)
}

/// Computes the per-bucket source mix for the declared energy sources.
///
/// Returns one [`EnergyAllocation`] per bucket, in input order and without
/// normalization.  Returns an empty sequence when fewer than two source
/// categories are declared (proportional attribution is meaningless with a
/// single source) or when no declared source has a series to take the bucket
/// count from.  Callers must treat an empty result as "allocation not
/// available", not as an error.
pub fn compute_source_mix(
    stats: &impl StatisticsSource,
    prefs: &EnergyPreferences,
) -> Vec<EnergyAllocation> {
    // Grid only counts as a source category if it declares at least one
    // import reference.
    let grid = prefs
        .first_grid()
        .filter(|(flow_from, _)| !flow_from.is_empty());
    let first_solar = prefs.solar_stats().next();
    let first_battery = prefs.battery_stats().next();

    let num_sources =
        grid.is_some() as usize + first_solar.is_some() as usize + first_battery.is_some() as usize;
    if num_sources < 2 {
        tracing::debug!(
            "Only {num_sources} energy sources declared, skipping allocation analysis."
        );
        return Vec::new();
    }

    // The bucket count comes from whichever category is present, checked in
    // grid import, solar, battery priority order.
    let count_stat = if let Some((flow_from, _)) = grid {
        Some(flow_from[0].stat_energy_from.as_str())
    } else {
        first_solar.or(first_battery.map(|(from, _)| from))
    };
    let Some(count_stat) = count_stat else {
        tracing::warn!("No energy source declared, cannot determine bucket count.");
        return Vec::new();
    };
    let Some(count_series) = stats.series(count_stat) else {
        tracing::warn!("No series for statistic {count_stat}, cannot determine bucket count.");
        return Vec::new();
    };

    (0..count_series.len())
        .map(|i| {
            let mut allocation = EnergyAllocation::default();
            for source in prefs.sources() {
                match source {
                    EnergySource::Solar { stat_energy_from } => {
                        allocation.from_gen += change_at(stats, stat_energy_from, i);
                    }
                    EnergySource::Battery {
                        stat_energy_from, ..
                    } => {
                        allocation.from_batt += change_at(stats, stat_energy_from, i);
                    }
                    EnergySource::Grid { flow_from, .. } => {
                        for flow in flow_from {
                            allocation.from_grid += change_at(stats, &flow.stat_energy_from, i);
                        }
                    }
                }
            }
            allocation
        })
        .collect()
}

/// Splits each consumer's measured energy across source categories, in
/// proportion to the per-bucket mix.
///
/// Rollup meters (statistic ids that other consumers declare themselves
/// included in) are excluded from the returned mapping.  A consumer whose
/// series is shorter than the mix gets allocations only for the buckets it
/// has; the remainder is silently truncated.
pub fn allocate_consumers(
    mix: &[EnergyAllocation],
    stats: &impl StatisticsSource,
    consumers: &[ConsumerPreference],
) -> BTreeMap<String, Vec<EnergyAllocation>> {
    let excluded = exclusion_set(consumers);

    let mut allocations = BTreeMap::new();
    for consumer in consumers {
        if excluded.contains(&consumer.stat_consumption) {
            continue;
        }
        let series = stats.series(&consumer.stat_consumption).unwrap_or(&[]);

        let per_bucket = mix
            .iter()
            .zip(series)
            .map(|(bucket, value)| {
                let (ratio_gen, ratio_batt, ratio_grid) = bucket.ratios();
                let delta = value.change.unwrap_or(0.0);
                EnergyAllocation {
                    from_gen: ratio_gen * delta,
                    from_batt: ratio_batt * delta,
                    from_grid: ratio_grid * delta,
                }
            })
            .collect();
        allocations.insert(consumer.stat_consumption.clone(), per_bucket);
    }
    allocations
}
