use bevy::prelude::*;

use crate::config::{GRID_HEIGHT, GRID_WIDTH};
use crate::congestion::update_congestion;
use crate::edge_cost::EdgeCost;
use crate::flow_distribution::{distribute_flow, DemandSource};
use crate::flow_propagation::propagate_flow;
use crate::grid::{PathwayGrid, PathwayKind, PlacementError, TilePos};
use crate::network_graph::NetworkGraph;
use crate::path_cache::PathCache;
use crate::pathfinding_sys::{Path, PathSearchStats, Pathfinder};
use crate::proximity::ProximityCache;
use crate::rail::{PowerProvider, RailSystem};
use crate::transport_params::TransportParams;

use super::events::TransportEvent;
use super::snapshot::TransportStats;

/// Owner of the pathway and rail grids and the per-tick pipeline that turns
/// demand into flow, congestion and decay.
///
/// All mutation goes through this type so the dirty flags and the path-cache
/// topology version stay consistent. Other subsystems read through
/// [`super::TransportProvider`].
#[derive(Resource)]
pub struct TransportSystem {
    pub(super) params: TransportParams,
    pub(super) grid: PathwayGrid,
    pub(super) graph: NetworkGraph,
    pub(super) proximity: ProximityCache,
    edge_cost: EdgeCost,
    pathfinder: Pathfinder,
    pub(super) path_cache: PathCache,
    pub(super) rail: RailSystem,
    demand: Vec<DemandSource>,
    pub(super) tick: u64,
    events: Vec<TransportEvent>,
    /// Set by a pathway rebuild that happened outside `tick` (lazy refresh
    /// from a path query) so the change is still reported.
    topology_event_pending: bool,
    pub(super) stats: TransportStats,
}

impl Default for TransportSystem {
    fn default() -> Self {
        Self::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

impl TransportSystem {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_params(width, height, TransportParams::default())
    }

    pub fn with_params(width: usize, height: usize, mut params: TransportParams) -> Self {
        params.sanitize();
        let grid = PathwayGrid::with_kinds(width, height, params.pathway_kinds.clone());
        let proximity = ProximityCache::new(width, height);
        let rail = RailSystem::new(width, height);
        assert_eq!(
            (grid.width(), grid.height()),
            (rail.width(), rail.height()),
            "pathway and rail grids must share dimensions"
        );
        Self {
            edge_cost: EdgeCost::from_params(&params),
            path_cache: PathCache::new(params.path_cache_capacity, params.path_cache_max_age_ticks),
            params,
            grid,
            graph: NetworkGraph::default(),
            proximity,
            pathfinder: Pathfinder::default(),
            rail,
            demand: Vec::new(),
            tick: 0,
            events: Vec::new(),
            topology_event_pending: false,
            stats: TransportStats::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    pub fn grid(&self) -> &PathwayGrid {
        &self.grid
    }

    pub fn network_graph(&self) -> &NetworkGraph {
        &self.graph
    }

    pub fn proximity(&self) -> &ProximityCache {
        &self.proximity
    }

    pub fn rail(&self) -> &RailSystem {
        &self.rail
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.path_cache
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Events produced by the most recent tick.
    pub fn events(&self) -> &[TransportEvent] {
        &self.events
    }

    /// Replace the tuning. Cache limits and edge costs apply immediately;
    /// new pathway kind capacities apply to tiles placed afterwards.
    pub fn set_params(&mut self, mut params: TransportParams) {
        params.sanitize();
        if params.proximity_max_distance != self.params.proximity_max_distance {
            self.proximity.mark_dirty();
        }
        self.edge_cost = EdgeCost::from_params(&params);
        self.path_cache
            .configure(params.path_cache_capacity, params.path_cache_max_age_ticks);
        self.grid.set_kinds(params.pathway_kinds.clone());
        self.params = params;
    }

    // -----------------------------------------------------------------------
    // External collaborators
    // -----------------------------------------------------------------------

    pub fn set_power_provider(&mut self, provider: Box<dyn PowerProvider>) {
        self.rail.set_power_provider(provider);
    }

    pub fn clear_power_provider(&mut self) {
        self.rail.clear_power_provider();
    }

    /// Replace this tick's demand. Sources persist until replaced.
    pub fn set_demand_sources(&mut self, sources: Vec<DemandSource>) {
        self.demand = sources;
    }

    pub fn add_demand_source(&mut self, source: DemandSource) {
        self.demand.push(source);
    }

    pub fn clear_demand_sources(&mut self) {
        self.demand.clear();
    }

    pub fn demand_sources(&self) -> &[DemandSource] {
        &self.demand
    }

    // -----------------------------------------------------------------------
    // Pathway placement
    // -----------------------------------------------------------------------

    pub fn place_pathway(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.place_pathway_kind(x, y, PathwayKind::Road)
    }

    /// Pathways may cross rail track but never share a cell with a terminal.
    pub fn place_pathway_kind(
        &mut self,
        x: usize,
        y: usize,
        kind: PathwayKind,
    ) -> Result<(), PlacementError> {
        if self.rail.get(x, y).is_terminal() {
            return Err(PlacementError::OccupiedByTerminal);
        }
        self.grid.place_kind(x, y, kind)?;
        self.proximity.mark_dirty();
        Ok(())
    }

    pub fn remove_pathway(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.grid.remove(x, y)?;
        self.proximity.mark_dirty();
        Ok(())
    }

    pub fn set_pathway_health(&mut self, x: usize, y: usize, health: u8) -> bool {
        self.grid.set_health(x, y, health)
    }

    pub fn damage_pathway(&mut self, x: usize, y: usize, amount: u8) -> bool {
        self.grid.damage(x, y, amount)
    }

    pub fn repair_pathway(&mut self, x: usize, y: usize, amount: u8) -> bool {
        self.grid.repair(x, y, amount)
    }

    pub fn set_pathway_capacity(&mut self, x: usize, y: usize, base_capacity: u32) -> bool {
        self.grid.set_base_capacity(x, y, base_capacity)
    }

    // -----------------------------------------------------------------------
    // Rail placement
    // -----------------------------------------------------------------------

    pub fn place_rail(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.rail.place_track(x, y)
    }

    pub fn remove_rail(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.rail.remove_track(x, y)
    }

    /// Bounds, a cell free of pathway and rail, and an adjacent track tile.
    pub fn can_place_terminal(&self, x: usize, y: usize) -> Result<(), PlacementError> {
        if !self.grid.is_in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
        if self.grid.is_pathway(x, y) {
            return Err(PlacementError::OccupiedByPathway);
        }
        self.rail.can_place_terminal(x, y)
    }

    pub fn place_terminal(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.can_place_terminal(x, y)?;
        self.rail.place_terminal(x, y)
    }

    pub fn remove_terminal(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.rail.remove_terminal(x, y)
    }

    // -----------------------------------------------------------------------
    // Path queries
    // -----------------------------------------------------------------------

    /// Shortest path between two pathway tiles, served from the cache when a
    /// fresh entry exists. A pending topology change is applied first so ids
    /// never lag behind placements.
    pub fn find_path(&mut self, start: TilePos, goal: TilePos) -> Option<Path> {
        if self.refresh_topology() {
            self.topology_event_pending = true;
        }
        if let Some(path) = self.path_cache.get(start, goal, self.tick) {
            return Some(path);
        }
        let path = self
            .pathfinder
            .find_path(&self.grid, &self.edge_cost, start, goal)?;
        self.path_cache.insert(start, goal, path.clone(), self.tick);
        Some(path)
    }

    pub fn search_stats(&self) -> PathSearchStats {
        self.pathfinder.stats()
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Rebuild network ids and the proximity field when stale. Returns
    /// whether the pathway networks were relabelled.
    fn refresh_topology(&mut self) -> bool {
        let relabel = self.grid.is_network_dirty();
        if relabel {
            let count = self.graph.rebuild(&mut self.grid);
            self.grid.clear_network_dirty();
            self.path_cache.bump_topology_version();
            info!(
                "Transport topology rebuilt: {} pathway networks, version {}",
                count,
                self.path_cache.topology_version()
            );
        }
        if relabel || self.proximity.is_dirty() {
            self.proximity
                .rebuild(&self.grid, self.params.proximity_max_distance);
        }
        relabel
    }

    /// Health loss for tiles that stayed heavily congested long enough.
    fn apply_decay(&mut self) -> u32 {
        let sustained = self.params.decay_sustained_ticks;
        let amount = self.params.decay_amount;
        let width = self.grid.width();
        let decaying: Vec<usize> = self
            .grid
            .tiles()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.present && t.congested_ticks >= sustained)
            .map(|(idx, _)| idx)
            .collect();
        for &idx in &decaying {
            self.grid.damage(idx % width, idx / width, amount);
        }
        decaying.len() as u32
    }

    /// Advance one simulation tick and return the events it produced.
    ///
    /// Phases run in a fixed order: topology refresh, flow reset, demand
    /// injection, diffusion, congestion, periodic decay, rail, events.
    pub fn tick(&mut self) -> &[TransportEvent] {
        self.events.clear();
        self.tick += 1;

        // 1. Topology.
        let relabelled = self.refresh_topology() || self.topology_event_pending;
        self.topology_event_pending = false;

        // 2. Flow reset.
        for tile in self.grid.tiles_mut() {
            tile.flow = 0;
        }

        // 3-4. Injection and diffusion.
        let distribution = distribute_flow(&mut self.grid, &self.proximity, &self.demand);
        let propagation = propagate_flow(&mut self.grid, self.params.spread_rate);

        // 5. Congestion.
        let congestion = update_congestion(&mut self.grid, &self.params);

        // 6. Decay, every N ticks.
        let decayed = if self.tick % self.params.decay_interval_ticks == 0 {
            self.apply_decay()
        } else {
            0
        };

        let rail_report = self.rail.tick();

        // 7. Events.
        if relabelled || rail_report.topology_rebuilt {
            self.events.push(TransportEvent::TopologyChanged {
                pathway_networks: self.graph.component_count(),
                rail_networks: self.rail.component_count(),
                version: self.path_cache.topology_version(),
            });
        }
        self.events
            .extend(congestion.crossings.iter().copied().map(TransportEvent::from));
        for change in &rail_report.terminal_changes {
            info!(
                "Rail terminal at ({}, {}) {}",
                change.pos.0,
                change.pos.1,
                if change.active { "activated" } else { "deactivated" }
            );
        }
        self.events.extend(
            rail_report
                .terminal_changes
                .iter()
                .copied()
                .map(TransportEvent::from),
        );

        self.refresh_stats(propagation.total_after, &congestion, &rail_report);
        debug!(
            "Transport tick {}: {} sources attached, {} skipped, flow {}, {} congested, {} blocked, {} decayed",
            self.tick,
            distribution.attached,
            distribution.skipped,
            propagation.total_after,
            congestion.congested_tiles,
            congestion.blocked_tiles,
            decayed
        );

        &self.events
    }
}
