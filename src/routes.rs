// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! Aggregate flow routes, the presentation-layer output of the engine, and
//! the keyed store that keeps them stable across refreshes.

use std::collections::BTreeMap;

/// Icon attached to generation routes.
pub const SOLAR_POWER_ICON: &str = "mdi:solar-power";

/// One node or edge of the flow diagram: a statistic id and its net
/// accumulated magnitude over the observed window, in kWh.
#[derive(Clone, Debug, PartialEq)]
pub struct ElecRoute {
    /// The statistic id this route aggregates.
    pub id: String,
    /// Optional display label.
    pub text: Option<String>,
    /// Optional icon identifier.
    pub icon: Option<&'static str>,
    /// Net accumulated magnitude over the observed window.
    pub rate: f64,
}

/// Aggregated source attribution of one consumer, summed over all of its
/// allocation buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConsumerMix {
    /// Energy attributed to grid import.
    pub rate_grid: f64,
    /// Energy attributed to generation.
    pub rate_generation: f64,
    /// Energy attributed to battery discharge.
    pub rate_battery: f64,
}

/// A consumer route: an [`ElecRoute`] plus its optional source attribution.
///
/// The mix is absent when no allocation could be computed for the consumer,
/// for example when fewer than two source categories are declared.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsumerRoute {
    /// The statistic id of the consumption meter.
    pub id: String,
    /// Optional display label.
    pub text: Option<String>,
    /// Optional icon identifier.
    pub icon: Option<&'static str>,
    /// Net accumulated consumption over the observed window.
    pub rate: f64,
    /// Source attribution, when available.
    pub mix: Option<ConsumerMix>,
}

/// A pair of directional routes for one battery.
#[derive(Clone, Debug, PartialEq)]
pub struct ElecRoutePair {
    /// Discharge into the system.
    pub route_in: ElecRoute,
    /// Charge taken out of the system.
    pub route_out: ElecRoute,
}

/// An ordered keyed store of routes, keyed by statistic id.
///
/// The diagram renders routes keyed by id, so entries must keep their
/// identity across refreshes: [`upsert`][RouteStore::upsert] mutates existing
/// entries in place and never discards or reorders entries whose source data
/// is temporarily absent.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteStore<R> {
    entries: BTreeMap<String, R>,
}

impl<R> Default for RouteStore<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R> RouteStore<R> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the entry with the given id in place, or inserts a fresh one
    /// if the id is new.
    pub fn upsert(&mut self, id: &str, insert: impl FnOnce() -> R, update: impl FnOnce(&mut R)) {
        match self.entries.get_mut(id) {
            Some(route) => update(route),
            None => {
                self.entries.insert(id.to_owned(), insert());
            }
        }
    }

    /// Returns the entry with the given id, if it exists.
    pub fn get(&self, id: &str) -> Option<&R> {
        self.entries.get(id)
    }

    /// Returns an iterator over the entries, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.entries.iter().map(|(id, route)| (id.as_str(), route))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
