// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! Energy source and consumer declarations, as exposed by the host's
//! preference store.
//!
//! Declarations are configuration data, not live state: they name the
//! external statistic series that feed the engine, they never carry
//! measurements themselves.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A grid import reference: energy entering the system through this meter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridFlowFrom {
    /// The statistic id of the import meter.
    pub stat_energy_from: String,
}

/// A grid export reference: energy leaving the system through this meter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridFlowTo {
    /// The statistic id of the export meter.
    pub stat_energy_to: String,
}

/// A declared energy source.
///
/// This is a closed set: the mix calculator and the route builders match on
/// it exhaustively, so adding a new source category (wind, CHP, ...) is a
/// compile-time checked change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnergySource {
    /// The utility grid, with its import and export meter references.
    Grid {
        flow_from: Vec<GridFlowFrom>,
        flow_to: Vec<GridFlowTo>,
    },
    /// A solar generation meter.
    Solar { stat_energy_from: String },
    /// A battery.  `stat_energy_from` measures discharge into the system,
    /// `stat_energy_to` measures charge taken out of it.
    Battery {
        stat_energy_from: String,
        stat_energy_to: String,
    },
}

/// A declared consumer meter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumerPreference {
    /// The statistic id of the consumption meter.
    pub stat_consumption: String,

    /// Optional display name, overriding the label provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The statistic id of another consumer meter whose measurements already
    /// include this one.  Meters named here are rollup meters and are
    /// excluded from allocation to avoid double counting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_in_stat: Option<String>,
}

/// The validated set of source and consumer declarations that drive one
/// engine instance.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyPreferences {
    sources: Vec<EnergySource>,
    consumers: Vec<ConsumerPreference>,
}

impl EnergyPreferences {
    /// Creates a new [`EnergyPreferences`] from the given declarations.
    ///
    /// Returns an error if any declaration references an empty statistic id,
    /// or if a consumer claims to be included in its own meter.
    pub fn try_new(
        sources: Vec<EnergySource>,
        consumers: Vec<ConsumerPreference>,
    ) -> Result<Self, Error> {
        for source in &sources {
            match source {
                EnergySource::Grid { flow_from, flow_to } => {
                    if flow_from.iter().any(|f| f.stat_energy_from.is_empty())
                        || flow_to.iter().any(|f| f.stat_energy_to.is_empty())
                    {
                        return Err(Error::invalid_preferences(
                            "Grid declaration references an empty statistic id.",
                        ));
                    }
                }
                EnergySource::Solar { stat_energy_from } => {
                    if stat_energy_from.is_empty() {
                        return Err(Error::invalid_preferences(
                            "Solar declaration references an empty statistic id.",
                        ));
                    }
                }
                EnergySource::Battery {
                    stat_energy_from,
                    stat_energy_to,
                } => {
                    if stat_energy_from.is_empty() || stat_energy_to.is_empty() {
                        return Err(Error::invalid_preferences(
                            "Battery declaration references an empty statistic id.",
                        ));
                    }
                }
            }
        }

        for consumer in &consumers {
            if consumer.stat_consumption.is_empty() {
                return Err(Error::invalid_consumer(
                    "Consumer declaration references an empty statistic id.",
                ));
            }
            if consumer.included_in_stat.as_deref() == Some(consumer.stat_consumption.as_str()) {
                return Err(Error::invalid_consumer(format!(
                    "Consumer {} claims to be included in itself.",
                    consumer.stat_consumption
                )));
            }
        }

        Ok(Self { sources, consumers })
    }

    /// Returns the declared energy sources.
    pub fn sources(&self) -> &[EnergySource] {
        &self.sources
    }

    /// Returns the declared consumers.
    pub fn consumers(&self) -> &[ConsumerPreference] {
        &self.consumers
    }

    /// Returns the import and export references of the first declared grid
    /// source, if one exists.
    pub fn first_grid(&self) -> Option<(&[GridFlowFrom], &[GridFlowTo])> {
        self.sources.iter().find_map(|source| match source {
            EnergySource::Grid { flow_from, flow_to } => {
                Some((flow_from.as_slice(), flow_to.as_slice()))
            }
            EnergySource::Solar { .. } | EnergySource::Battery { .. } => None,
        })
    }

    /// Returns an iterator over the statistic ids of the declared solar
    /// sources.
    pub fn solar_stats(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().filter_map(|source| match source {
            EnergySource::Solar { stat_energy_from } => Some(stat_energy_from.as_str()),
            EnergySource::Grid { .. } | EnergySource::Battery { .. } => None,
        })
    }

    /// Returns an iterator over the (discharge, charge) statistic id pairs of
    /// the declared batteries.
    pub fn battery_stats(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources.iter().filter_map(|source| match source {
            EnergySource::Battery {
                stat_energy_from,
                stat_energy_to,
            } => Some((stat_energy_from.as_str(), stat_energy_to.as_str())),
            EnergySource::Grid { .. } | EnergySource::Solar { .. } => None,
        })
    }
}

/// Returns the set of rollup meters: every statistic id that some consumer
/// declares itself included in.
///
/// Rollup meters double count a subset of consumption that is already
/// itemized separately, so both the allocator and the route builder skip
/// them.
pub fn exclusion_set(consumers: &[ConsumerPreference]) -> BTreeSet<String> {
    consumers
        .iter()
        .filter_map(|consumer| consumer.included_in_stat.clone())
        .collect()
}
