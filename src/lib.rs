// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

/*!
# Energy Flow Routes

This is a library for attributing time-bucketed consumer energy to the
sources (grid import, solar generation, battery discharge) that most
plausibly supplied it, and for aggregating the result into the flow routes a
sankey-style energy diagram renders.

The attribution is a statistical proxy, not a measurement: each bucket's
whole-system source mix is assumed to apply uniformly to every consumer
drawing energy in that bucket.

## The `StatisticsSource` and `StatisticLabeler` traits

Because `energy-flow-routes` is an independent library, it doesn't know how
the host stores statistics or labels and instead uses traits to interact with
them.  A host with richer primitives (a recorder database, for instance)
should implement [`StatisticsSource`] directly; hosts that already hold all
series in memory can use the bundled [`StatisticsSnapshot`].

## The pipeline

A complete statistics snapshot is pushed by the host whenever fresh data is
ready, and triggers one synchronous pass:

1. [`compute_source_mix`] sums per-bucket source energy into one
   [`EnergyAllocation`] per bucket.
2. [`allocate_consumers`] splits each consumer's measured deltas across the
   source categories, in proportion to the bucket mix.
3. [`FlowEngine::update`] aggregates everything into flow routes, keyed by
   statistic id and stable in identity across snapshots.

Underspecified preferences never fail the pass: with fewer than two source
categories the engine still builds routes, it just leaves consumer mixes
absent.
*/

mod allocation;
pub use allocation::{allocate_consumers, compute_source_mix, EnergyAllocation};

mod config;
pub use config::{FlowEngineConfig, HIDE_CONSUMERS_BELOW_THRESHOLD_KWH};

mod engine;
pub use engine::FlowEngine;

mod error;
pub use error::Error;

mod preferences;
pub use preferences::{
    exclusion_set, ConsumerPreference, EnergyPreferences, EnergySource, GridFlowFrom, GridFlowTo,
};

mod providers;
pub use providers::{StatisticLabeler, StatisticsSource};

mod routes;
pub use routes::{
    ConsumerMix, ConsumerRoute, ElecRoute, ElecRoutePair, RouteStore, SOLAR_POWER_ICON,
};

mod statistics;
pub use statistics::{StaticLabels, StatisticValue, StatisticsSnapshot};

#[cfg(test)]
mod test_utils;
