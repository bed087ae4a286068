use pathfinding::prelude::bfs_reach;

use crate::config::NO_NETWORK;
use crate::congestion::{contamination_rate, value_penalty};
use crate::grid::{PathwayGrid, TilePos};
use crate::pathfinding_sys::Path;

use super::system::TransportSystem;

/// Read access to transport state for zone, building and port logic.
///
/// Every query is bounds-safe: positions off the map answer with the inert
/// default (`false`, `0`, the proximity sentinel) instead of panicking.
pub trait TransportProvider {
    /// Both positions are pathway tiles in the same network.
    fn is_connected(&self, a: TilePos, b: TilePos) -> bool;
    fn is_pathway_at(&self, x: usize, y: usize) -> bool;
    fn network_id_at(&self, x: usize, y: usize) -> u32;
    fn flow_at(&self, x: usize, y: usize) -> u32;
    fn congestion_at(&self, x: usize, y: usize) -> u8;
    fn capacity_at(&self, x: usize, y: usize) -> u32;
    fn health_at(&self, x: usize, y: usize) -> u8;
    fn is_blocked_at(&self, x: usize, y: usize) -> bool;
    /// Steps to the nearest pathway tile.
    fn proximity_at(&self, x: usize, y: usize) -> u8;
    fn contamination_at(&self, x: usize, y: usize) -> f32;
    fn value_penalty_at(&self, x: usize, y: usize) -> f32;
    fn find_path(&mut self, start: TilePos, goal: TilePos) -> Option<Path>;
    fn is_rail_active_at(&self, x: usize, y: usize) -> bool;
    fn is_terminal_active_at(&self, x: usize, y: usize) -> bool;
    fn is_covered_by_terminal(&self, x: usize, y: usize) -> bool;
    fn covering_terminals(&self, x: usize, y: usize) -> Vec<TilePos>;
}

impl TransportProvider for TransportSystem {
    fn is_connected(&self, a: TilePos, b: TilePos) -> bool {
        if self.grid.is_network_dirty() {
            return reachable_over_pathways(&self.grid, a, b);
        }
        let ia = self.grid.get(a.0, a.1).network_id;
        ia != NO_NETWORK && ia == self.grid.get(b.0, b.1).network_id
    }

    fn is_pathway_at(&self, x: usize, y: usize) -> bool {
        self.grid.is_pathway(x, y)
    }

    fn network_id_at(&self, x: usize, y: usize) -> u32 {
        self.grid.get(x, y).network_id
    }

    fn flow_at(&self, x: usize, y: usize) -> u32 {
        self.grid.get(x, y).flow
    }

    fn congestion_at(&self, x: usize, y: usize) -> u8 {
        self.grid.get(x, y).congestion
    }

    fn capacity_at(&self, x: usize, y: usize) -> u32 {
        self.grid.get(x, y).current_capacity
    }

    fn health_at(&self, x: usize, y: usize) -> u8 {
        let tile = self.grid.get(x, y);
        if tile.present {
            tile.health
        } else {
            0
        }
    }

    fn is_blocked_at(&self, x: usize, y: usize) -> bool {
        self.grid.get(x, y).blocked
    }

    fn proximity_at(&self, x: usize, y: usize) -> u8 {
        self.proximity.distance(x, y)
    }

    fn contamination_at(&self, x: usize, y: usize) -> f32 {
        contamination_rate(self.congestion_at(x, y), &self.params)
    }

    fn value_penalty_at(&self, x: usize, y: usize) -> f32 {
        value_penalty(self.congestion_at(x, y), &self.params)
    }

    fn find_path(&mut self, start: TilePos, goal: TilePos) -> Option<Path> {
        TransportSystem::find_path(self, start, goal)
    }

    fn is_rail_active_at(&self, x: usize, y: usize) -> bool {
        self.rail.is_active_at(x, y)
    }

    fn is_terminal_active_at(&self, x: usize, y: usize) -> bool {
        self.rail.is_terminal_active_at(x, y)
    }

    fn is_covered_by_terminal(&self, x: usize, y: usize) -> bool {
        self.rail
            .is_covered_by_terminal(x, y, self.params.terminal_service_radius)
    }

    fn covering_terminals(&self, x: usize, y: usize) -> Vec<TilePos> {
        self.rail
            .covering_terminals(x, y, self.params.terminal_service_radius)
    }
}

/// Flood from `a` over present tiles. Answers connectivity while placements
/// are pending and the network ids are stale.
fn reachable_over_pathways(grid: &PathwayGrid, a: TilePos, b: TilePos) -> bool {
    if !grid.is_pathway(a.0, a.1) || !grid.is_pathway(b.0, b.1) {
        return false;
    }
    bfs_reach(a, |&TilePos(x, y)| {
        let (neighbors, count) = grid.neighbors4(x, y);
        neighbors[..count]
            .iter()
            .filter(|&&(nx, ny)| grid.is_pathway(nx, ny))
            .map(|&(nx, ny)| TilePos(nx, ny))
            .collect::<Vec<_>>()
    })
    .any(|p| p == b)
}
