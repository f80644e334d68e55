// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! This module contains the configuration options for the `FlowEngine`.

use serde::{Deserialize, Serialize};

/// Consumers with less accumulated energy than this are dropped from
/// [`visible_consumers`][crate::FlowEngine::visible_consumers] when
/// [`hide_small_consumers`][FlowEngineConfig::hide_small_consumers] is set,
/// in kWh.
pub const HIDE_CONSUMERS_BELOW_THRESHOLD_KWH: f64 = 0.1;

/// Configuration options for the `FlowEngine`.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowEngineConfig {
    /// Whether to drop consumers below
    /// [`HIDE_CONSUMERS_BELOW_THRESHOLD_KWH`] from the visible consumer
    /// list.
    pub hide_small_consumers: bool,

    /// Maximum number of consumer branches to expose to the diagram.  Zero
    /// means unlimited.
    pub max_consumer_branches: usize,

    /// Whether the diagram should assume batteries charge only from
    /// generation.  Carried for the diagram; attribution itself does not
    /// consult it.
    pub battery_charge_only_from_generation: bool,
}
