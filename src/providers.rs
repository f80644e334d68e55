// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! This module contains the traits that need to be implemented by the types
//! that supply statistics and display labels to the engine.

use crate::statistics::StatisticValue;

/**
This trait needs to be implemented by the type that supplies statistic series.

Because `energy-flow-routes` is an independent library, it doesn't know where
statistics come from (a recorder database, a websocket subscription, a test
fixture) and instead uses this trait to read them.

A snapshot is complete and in-memory: the engine never blocks on a
[`StatisticsSource`], so implementations must resolve all series before
handing the snapshot to the engine.

<details>
<summary>Example implementation for a recorder snapshot payload:</summary>

```ignore
impl energy_flow_routes::StatisticsSource for RecorderSnapshot {
    fn series(&self, stat_id: &str) -> Option<&[StatisticValue]> {
        self.stats.get(stat_id).map(Vec::as_slice)
    }

    fn sum_growth(&self, stat_ids: &[&str]) -> Option<f64> {
        // The recorder already tracks monotonic sums, so it can answer
        // this directly instead of re-adding bucket deltas.
        self.sum_growth_over_window(stat_ids)
    }
}
```

</details>
*/
pub trait StatisticsSource {
    /// Returns the time-ascending series recorded for the given statistic id,
    /// if one exists in the snapshot.
    fn series(&self, stat_id: &str) -> Option<&[StatisticValue]>;

    /// Returns the accumulated growth over the snapshot's window, summed
    /// across the given statistic ids.
    ///
    /// Returns `None` when none of the requested ids has any data.
    fn sum_growth(&self, stat_ids: &[&str]) -> Option<f64>;
}

/// This trait needs to be implemented by the type that maps statistic ids to
/// human-readable display labels.
///
/// Returning `None` is always acceptable; routes without a label fall back to
/// being identified by their statistic id.
pub trait StatisticLabeler {
    /// Returns the display label for the given statistic id, if one is known.
    fn label(&self, stat_id: &str) -> Option<String>;
}
