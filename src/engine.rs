// License: MIT
// Copyright © 2025 Energy Flow Routes contributors

//! The [`FlowEngine`]: one full recomputation pass per statistics snapshot.
//!
//! The engine is push-driven and synchronous.  Whenever the statistics
//! collaborator delivers a fresh snapshot, the host calls
//! [`update`][FlowEngine::update] once, which runs the whole pipeline (source
//! mix, consumer allocation, route aggregation) before returning.  The engine
//! never blocks or performs I/O, and a newer snapshot simply supersedes the
//! previous pass's results.

use std::collections::BTreeMap;

use crate::allocation::{allocate_consumers, compute_source_mix, EnergyAllocation};
use crate::config::{FlowEngineConfig, HIDE_CONSUMERS_BELOW_THRESHOLD_KWH};
use crate::preferences::{exclusion_set, EnergyPreferences};
use crate::providers::{StatisticLabeler, StatisticsSource};
use crate::routes::{
    ConsumerMix, ConsumerRoute, ElecRoute, ElecRoutePair, RouteStore, SOLAR_POWER_ICON,
};

/// Builds and maintains the flow routes for one diagram.
///
/// Route entries keep their identity across snapshots: once created for a
/// statistic id, an entry is only ever mutated in place, so the diagram can
/// treat routes as stable by key.
#[derive(Clone, Debug, Default)]
pub struct FlowEngine {
    config: FlowEngineConfig,
    grid_in: Option<ElecRoute>,
    grid_out: Option<ElecRoute>,
    generation: RouteStore<ElecRoute>,
    consumers: RouteStore<ConsumerRoute>,
    batteries: RouteStore<ElecRoutePair>,
}

impl FlowEngine {
    /// Creates a new engine with the given configuration and no routes.
    pub fn new(config: FlowEngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the engine's configuration.
    pub fn config(&self) -> &FlowEngineConfig {
        &self.config
    }

    /// Runs one full recomputation pass against a fresh statistics snapshot.
    pub fn update<S, L>(&mut self, prefs: &EnergyPreferences, stats: &S, labels: &L)
    where
        S: StatisticsSource,
        L: StatisticLabeler,
    {
        let mix = compute_source_mix(stats, prefs);
        let allocations = allocate_consumers(&mix, stats, prefs.consumers());

        self.update_grid_routes(prefs, stats);
        self.update_generation_routes(prefs, stats, labels);
        self.update_consumer_routes(prefs, stats, labels, &allocations);
        self.update_battery_routes(prefs, stats);
    }

    /// The grid import route, if a grid with import references is declared.
    pub fn grid_in_route(&self) -> Option<&ElecRoute> {
        self.grid_in.as_ref()
    }

    /// The grid export route, if a grid with export references is declared.
    pub fn grid_out_route(&self) -> Option<&ElecRoute> {
        self.grid_out.as_ref()
    }

    /// The generation routes, one per declared solar meter.
    pub fn generation_routes(&self) -> &RouteStore<ElecRoute> {
        &self.generation
    }

    /// The consumer routes, one per declared non-rollup consumer meter.
    pub fn consumer_routes(&self) -> &RouteStore<ConsumerRoute> {
        &self.consumers
    }

    /// The battery route pairs, one per declared battery, keyed by the
    /// discharge meter.
    pub fn battery_routes(&self) -> &RouteStore<ElecRoutePair> {
        &self.batteries
    }

    /// Returns the consumer routes the diagram should show, ordered by
    /// descending rate, honoring the configured small-consumer threshold and
    /// branch limit.
    pub fn visible_consumers(&self) -> Vec<&ConsumerRoute> {
        let mut routes: Vec<&ConsumerRoute> = self.consumers.iter().map(|(_, r)| r).collect();
        routes.sort_by(|a, b| {
            b.rate
                .partial_cmp(&a.rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        if self.config.hide_small_consumers {
            routes.retain(|route| route.rate >= HIDE_CONSUMERS_BELOW_THRESHOLD_KWH);
        }
        if self.config.max_consumer_branches > 0 {
            routes.truncate(self.config.max_consumer_branches);
        }
        routes
    }

    fn update_grid_routes(&mut self, prefs: &EnergyPreferences, stats: &impl StatisticsSource) {
        let Some((flow_from, flow_to)) = prefs.first_grid() else {
            return;
        };

        if !flow_from.is_empty() {
            let stat_ids: Vec<&str> = flow_from
                .iter()
                .map(|flow| flow.stat_energy_from.as_str())
                .collect();
            let rate = stats.sum_growth(&stat_ids).unwrap_or(0.0);
            upsert_slot(&mut self.grid_in, stat_ids[0], rate);
        }
        if !flow_to.is_empty() {
            let stat_ids: Vec<&str> = flow_to
                .iter()
                .map(|flow| flow.stat_energy_to.as_str())
                .collect();
            let rate = stats.sum_growth(&stat_ids).unwrap_or(0.0);
            upsert_slot(&mut self.grid_out, stat_ids[0], rate);
        }
    }

    fn update_generation_routes(
        &mut self,
        prefs: &EnergyPreferences,
        stats: &impl StatisticsSource,
        labels: &impl StatisticLabeler,
    ) {
        for stat_id in prefs.solar_stats() {
            let rate = stats.sum_growth(&[stat_id]).unwrap_or(0.0);
            self.generation.upsert(
                stat_id,
                || ElecRoute {
                    id: stat_id.to_owned(),
                    text: labels.label(stat_id),
                    icon: Some(SOLAR_POWER_ICON),
                    rate,
                },
                |route| route.rate = rate,
            );
        }
    }

    fn update_consumer_routes(
        &mut self,
        prefs: &EnergyPreferences,
        stats: &impl StatisticsSource,
        labels: &impl StatisticLabeler,
        allocations: &BTreeMap<String, Vec<EnergyAllocation>>,
    ) {
        let excluded = exclusion_set(prefs.consumers());

        for consumer in prefs.consumers() {
            if excluded.contains(&consumer.stat_consumption) {
                continue;
            }
            let stat_id = consumer.stat_consumption.as_str();
            let rate = stats.sum_growth(&[stat_id]).unwrap_or(0.0);
            self.consumers.upsert(
                stat_id,
                || {
                    // Only the non-negative contributions count towards the
                    // aggregated mix.  Negative values should not occur given
                    // the ratio construction, but are clamped out regardless.
                    let mix = allocations
                        .get(stat_id)
                        .filter(|buckets| !buckets.is_empty())
                        .map(|buckets| ConsumerMix {
                            rate_grid: buckets.iter().map(|a| a.from_grid.max(0.0)).sum(),
                            rate_generation: buckets.iter().map(|a| a.from_gen.max(0.0)).sum(),
                            rate_battery: buckets.iter().map(|a| a.from_batt.max(0.0)).sum(),
                        });
                    ConsumerRoute {
                        id: stat_id.to_owned(),
                        text: consumer.name.clone().or_else(|| labels.label(stat_id)),
                        icon: None,
                        rate,
                        mix,
                    }
                },
                |route| route.rate = rate,
            );
        }
    }

    fn update_battery_routes(&mut self, prefs: &EnergyPreferences, stats: &impl StatisticsSource) {
        for (from_stat, to_stat) in prefs.battery_stats() {
            let in_rate = stats.sum_growth(&[from_stat]).unwrap_or(0.0);
            let out_rate = stats.sum_growth(&[to_stat]).unwrap_or(0.0);
            self.batteries.upsert(
                from_stat,
                || ElecRoutePair {
                    route_in: ElecRoute {
                        id: from_stat.to_owned(),
                        text: None,
                        icon: None,
                        rate: in_rate,
                    },
                    route_out: ElecRoute {
                        id: to_stat.to_owned(),
                        text: None,
                        icon: None,
                        rate: out_rate,
                    },
                },
                |pair| {
                    pair.route_in.rate = in_rate;
                    pair.route_out.rate = out_rate;
                },
            );
        }
    }
}

/// Update-or-insert for the singular grid route slots.  The slot keeps its
/// identity while the leading meter id is unchanged.
fn upsert_slot(slot: &mut Option<ElecRoute>, id: &str, rate: f64) {
    match slot {
        Some(route) if route.id == id => route.rate = rate,
        _ => {
            *slot = Some(ElecRoute {
                id: id.to_owned(),
                text: None,
                icon: None,
                rate,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        assert_close, battery_source, consumer, consumer_included_in, grid_source, named_consumer,
        prefs, series, solar_source,
    };
    use crate::{StaticLabels, StatisticsSnapshot};

    fn household_prefs() -> EnergyPreferences {
        prefs(
            vec![
                grid_source(&["grid_in"], &["grid_out"]),
                solar_source("pv"),
                battery_source("batt_out", "batt_in"),
            ],
            vec![
                named_consumer("oven", "Oven"),
                consumer_included_in("heat_pump", "downstairs"),
                consumer("downstairs"),
            ],
        )
    }

    fn household_snapshot() -> StatisticsSnapshot {
        let mut snapshot = StatisticsSnapshot::new();
        snapshot.insert("grid_in", series(&[10.0, 10.0]));
        snapshot.insert("grid_out", series(&[1.0, 2.0]));
        snapshot.insert("pv", series(&[0.0, 5.0]));
        snapshot.insert("batt_out", series(&[0.0, 0.0]));
        snapshot.insert("batt_in", series(&[0.5, 1.5]));
        snapshot.insert("oven", series(&[5.0, 5.0]));
        snapshot.insert("heat_pump", series(&[2.0, 2.0]));
        snapshot.insert("downstairs", series(&[8.0, 8.0]));
        snapshot
    }

    #[test]
    fn test_full_pass_builds_all_routes() {
        let mut labels = StaticLabels::new();
        labels.insert("pv", "Rooftop solar");
        labels.insert("heat_pump", "Heat pump");

        let mut engine = FlowEngine::new(FlowEngineConfig::default());
        engine.update(&household_prefs(), &household_snapshot(), &labels);

        let grid_in = engine.grid_in_route().unwrap();
        assert_eq!(grid_in.id, "grid_in");
        assert_close(grid_in.rate, 20.0);
        let grid_out = engine.grid_out_route().unwrap();
        assert_eq!(grid_out.id, "grid_out");
        assert_close(grid_out.rate, 3.0);

        let pv = engine.generation_routes().get("pv").unwrap();
        assert_eq!(pv.text.as_deref(), Some("Rooftop solar"));
        assert_eq!(pv.icon, Some(SOLAR_POWER_ICON));
        assert_close(pv.rate, 5.0);

        // The rollup meter is excluded, the itemized consumers are not.
        assert_eq!(engine.consumer_routes().len(), 2);
        assert!(engine.consumer_routes().get("downstairs").is_none());

        // Declared name wins over the label provider.
        let oven = engine.consumer_routes().get("oven").unwrap();
        assert_eq!(oven.text.as_deref(), Some("Oven"));
        assert_close(oven.rate, 10.0);
        // Bucket 0 is all grid; bucket 1 is 1/3 generation, 2/3 grid.
        let mix = oven.mix.unwrap();
        assert_close(mix.rate_generation, 5.0 / 3.0);
        assert_close(mix.rate_battery, 0.0);
        assert_close(mix.rate_grid, 5.0 + 10.0 / 3.0);

        let heat_pump = engine.consumer_routes().get("heat_pump").unwrap();
        assert_eq!(heat_pump.text.as_deref(), Some("Heat pump"));

        let battery = engine.battery_routes().get("batt_out").unwrap();
        assert_close(battery.route_in.rate, 0.0);
        assert_eq!(battery.route_out.id, "batt_in");
        assert_close(battery.route_out.rate, 2.0);
    }

    #[test]
    fn test_no_grid_leaves_routes_absent() {
        let prefs = prefs(vec![solar_source("pv")], vec![consumer("oven")]);
        let mut snapshot = StatisticsSnapshot::new();
        snapshot.insert("pv", series(&[5.0]));
        snapshot.insert("oven", series(&[2.0]));

        let mut engine = FlowEngine::new(FlowEngineConfig::default());
        engine.update(&prefs, &snapshot, &StaticLabels::new());

        assert!(engine.grid_in_route().is_none());
        assert!(engine.grid_out_route().is_none());
        // A single source category means no attribution for consumers.
        let oven = engine.consumer_routes().get("oven").unwrap();
        assert_eq!(oven.mix, None);
        assert_close(oven.rate, 2.0);
    }

    #[test]
    fn test_repeated_updates_preserve_identity() {
        let prefs = household_prefs();
        let mut engine = FlowEngine::new(FlowEngineConfig::default());
        engine.update(&prefs, &household_snapshot(), &StaticLabels::new());

        let before = engine.consumer_routes().get("oven").unwrap().clone();

        let mut next = household_snapshot();
        next.insert("oven", series(&[5.0, 5.0, 7.0]));
        next.insert("grid_in", series(&[10.0, 10.0, 7.0]));
        engine.update(&prefs, &next, &StaticLabels::new());

        let after = engine.consumer_routes().get("oven").unwrap();
        assert_close(after.rate, 17.0);
        // Identity fields survive the refresh; only the rate moves.
        assert_eq!(after.id, before.id);
        assert_eq!(after.text, before.text);
        assert_eq!(after.mix, before.mix);
    }

    #[test]
    fn test_update_is_idempotent() {
        let prefs = household_prefs();
        let snapshot = household_snapshot();
        let labels = StaticLabels::new();

        let mut engine = FlowEngine::new(FlowEngineConfig::default());
        engine.update(&prefs, &snapshot, &labels);
        let first = engine.clone();
        engine.update(&prefs, &snapshot, &labels);

        assert_eq!(engine.grid_in_route(), first.grid_in_route());
        assert_eq!(engine.grid_out_route(), first.grid_out_route());
        assert_eq!(engine.generation_routes(), first.generation_routes());
        assert_eq!(engine.consumer_routes(), first.consumer_routes());
        assert_eq!(engine.battery_routes(), first.battery_routes());
    }

    #[test]
    fn test_routes_survive_disappearing_data() {
        let prefs = household_prefs();
        let mut engine = FlowEngine::new(FlowEngineConfig::default());
        engine.update(&prefs, &household_snapshot(), &StaticLabels::new());

        // The next snapshot has lost the solar and oven series entirely.
        let mut sparse = StatisticsSnapshot::new();
        sparse.insert("grid_in", series(&[4.0]));
        engine.update(&prefs, &sparse, &StaticLabels::new());

        // Entries are kept, with their rates reset to zero growth.
        assert_close(engine.generation_routes().get("pv").unwrap().rate, 0.0);
        assert_close(engine.consumer_routes().get("oven").unwrap().rate, 0.0);
        assert_close(engine.grid_in_route().unwrap().rate, 4.0);
    }

    #[test]
    fn test_visible_consumers_ordering_and_limits() {
        let prefs = prefs(
            vec![grid_source(&["grid_in"], &[]), solar_source("pv")],
            vec![
                consumer("standby_hub"),
                consumer("oven"),
                consumer("heat_pump"),
            ],
        );
        let mut snapshot = StatisticsSnapshot::new();
        snapshot.insert("grid_in", series(&[10.0]));
        snapshot.insert("pv", series(&[5.0]));
        snapshot.insert("standby_hub", series(&[0.05]));
        snapshot.insert("oven", series(&[6.0]));
        snapshot.insert("heat_pump", series(&[9.0]));

        let mut engine = FlowEngine::new(FlowEngineConfig::default());
        engine.update(&prefs, &snapshot, &StaticLabels::new());
        assert!(engine
            .visible_consumers()
            .iter()
            .map(|r| r.id.as_str())
            .eq(["heat_pump", "oven", "standby_hub"]));

        let mut engine = FlowEngine::new(FlowEngineConfig {
            hide_small_consumers: true,
            ..FlowEngineConfig::default()
        });
        engine.update(&prefs, &snapshot, &StaticLabels::new());
        assert!(engine
            .visible_consumers()
            .iter()
            .map(|r| r.id.as_str())
            .eq(["heat_pump", "oven"]));

        let mut engine = FlowEngine::new(FlowEngineConfig {
            max_consumer_branches: 1,
            ..FlowEngineConfig::default()
        });
        engine.update(&prefs, &snapshot, &StaticLabels::new());
        assert!(engine
            .visible_consumers()
            .iter()
            .map(|r| r.id.as_str())
            .eq(["heat_pump"]));
    }

    #[test]
    fn test_grid_rate_sums_all_flows() {
        let prefs = prefs(
            vec![
                grid_source(&["grid_peak", "grid_offpeak"], &[]),
                solar_source("pv"),
            ],
            vec![],
        );
        let mut snapshot = StatisticsSnapshot::new();
        snapshot.insert("grid_peak", series(&[3.0]));
        snapshot.insert("grid_offpeak", series(&[2.0]));
        snapshot.insert("pv", series(&[1.0]));

        let mut engine = FlowEngine::new(FlowEngineConfig::default());
        engine.update(&prefs, &snapshot, &StaticLabels::new());

        let grid_in = engine.grid_in_route().unwrap();
        // The route is identified by the first import meter but aggregates
        // all of them.
        assert_eq!(grid_in.id, "grid_peak");
        assert_close(grid_in.rate, 5.0);
    }
}
