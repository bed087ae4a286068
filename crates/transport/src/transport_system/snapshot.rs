//! Plain-data views of transport state for serialization layers, and the
//! save/load round trip.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{GRID_HEIGHT, GRID_WIDTH};
use crate::congestion::CongestionReport;
use crate::grid::{PathwayKind, TilePos};
use crate::rail::{RailStructure, RailTickReport};
use crate::transport_params::TransportParams;
use crate::{decode_or_warn, Saveable};

use super::system::TransportSystem;

// =============================================================================
// Stats
// =============================================================================

/// Aggregates recomputed at the end of every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct TransportStats {
    pub tick: u64,
    pub pathway_tiles: u32,
    pub networks: u32,
    pub total_flow: u64,
    pub congested_tiles: u32,
    pub blocked_tiles: u32,
    pub average_health: f32,
    pub average_congestion: f32,
    pub rail_tracks: u32,
    pub terminals: u32,
    pub active_terminals: u32,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub searches: u64,
    pub short_circuits: u64,
}

impl TransportSystem {
    pub(super) fn refresh_stats(
        &mut self,
        total_flow: u64,
        congestion: &CongestionReport,
        rail: &RailTickReport,
    ) {
        let mut pathway_tiles = 0u32;
        let mut health_sum = 0u64;
        let mut congestion_sum = 0u64;
        for tile in self.grid.tiles().iter().filter(|t| t.present) {
            pathway_tiles += 1;
            health_sum += tile.health as u64;
            congestion_sum += tile.congestion as u64;
        }
        let (average_health, average_congestion) = if pathway_tiles > 0 {
            (
                health_sum as f32 / pathway_tiles as f32,
                congestion_sum as f32 / pathway_tiles as f32,
            )
        } else {
            (0.0, 0.0)
        };
        let cache = self.path_cache.stats();
        let search = self.search_stats();

        self.stats = TransportStats {
            tick: self.tick,
            pathway_tiles,
            networks: self.graph.component_count(),
            total_flow,
            congested_tiles: congestion.congested_tiles,
            blocked_tiles: congestion.blocked_tiles,
            average_health,
            average_congestion,
            rail_tracks: self.rail.track_count(),
            terminals: self.rail.terminal_count(),
            active_terminals: rail.active_terminals,
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            searches: search.searches,
            short_circuits: search.short_circuits,
        };
    }
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PathwayRecord {
    pub pos: TilePos,
    pub kind: PathwayKind,
    pub base_capacity: u32,
    pub current_capacity: u32,
    pub health: u8,
    pub network_id: u32,
    pub flow: u32,
    pub congestion: u8,
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct RailRecord {
    pub pos: TilePos,
    pub structure: RailStructure,
    pub network_id: u32,
    pub powered: bool,
    pub active: bool,
}

/// State-sync payload: every present pathway and rail cell plus aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct TransportSnapshot {
    pub tick: u64,
    pub width: u32,
    pub height: u32,
    pub topology_version: u64,
    pub pathways: Vec<PathwayRecord>,
    pub rail: Vec<RailRecord>,
    pub stats: TransportStats,
}

impl TransportSystem {
    pub fn snapshot(&self) -> TransportSnapshot {
        let width = self.grid.width();
        let pathways = self
            .grid
            .tiles()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.present)
            .map(|(idx, t)| PathwayRecord {
                pos: TilePos(idx % width, idx / width),
                kind: t.kind,
                base_capacity: t.base_capacity,
                current_capacity: t.current_capacity,
                health: t.health,
                network_id: t.network_id,
                flow: t.flow,
                congestion: t.congestion,
                blocked: t.blocked,
            })
            .collect();
        let rail = self
            .rail
            .tiles()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_present())
            .map(|(idx, t)| RailRecord {
                pos: TilePos(idx % width, idx / width),
                structure: t.structure,
                network_id: t.network_id,
                powered: t.powered,
                active: t.active,
            })
            .collect();

        TransportSnapshot {
            tick: self.tick,
            width: width as u32,
            height: self.grid.height() as u32,
            topology_version: self.path_cache.topology_version(),
            pathways,
            rail,
            stats: self.stats,
        }
    }
}

// =============================================================================
// Save / load
// =============================================================================

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct SavedPathway {
    x: u32,
    y: u32,
    kind: PathwayKind,
    base_capacity: u32,
    health: u8,
    /// Kept so a reload does not restart the sustained-congestion count
    /// that decay waits on.
    congested_ticks: u16,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct SavedRail {
    x: u32,
    y: u32,
    structure: RailStructure,
}

/// Largest map a save may describe. Anything bigger is treated as corrupt
/// rather than allocated.
const MAX_SAVED_TILES: usize = GRID_WIDTH * GRID_HEIGHT * 16;

/// Authored state plus the sustained-congestion counters. Network ids,
/// proximity, flow and activity are rebuilt by the first tick after loading.
#[derive(Debug, Clone, Default, Encode, Decode)]
struct TransportSaveData {
    width: u32,
    height: u32,
    tick: u64,
    params: Option<TransportParams>,
    pathways: Vec<SavedPathway>,
    rail: Vec<SavedRail>,
}

impl Saveable for TransportSystem {
    const SAVE_KEY: &'static str = "transport_network";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        let width = self.grid.width();
        let pathways: Vec<SavedPathway> = self
            .grid
            .tiles()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.present)
            .map(|(idx, t)| SavedPathway {
                x: (idx % width) as u32,
                y: (idx / width) as u32,
                kind: t.kind,
                base_capacity: t.base_capacity,
                health: t.health,
                congested_ticks: t.congested_ticks,
            })
            .collect();
        let rail: Vec<SavedRail> = self
            .rail
            .tiles()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_present())
            .map(|(idx, t)| SavedRail {
                x: (idx % width) as u32,
                y: (idx / width) as u32,
                structure: t.structure,
            })
            .collect();

        // Skip saving an empty network.
        if pathways.is_empty() && rail.is_empty() {
            return None;
        }

        let data = TransportSaveData {
            width: width as u32,
            height: self.grid.height() as u32,
            tick: self.tick,
            params: Some(self.params.clone()),
            pathways,
            rail,
        };
        Some(bitcode::encode(&data))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let data: TransportSaveData = decode_or_warn(Self::SAVE_KEY, bytes);
        if data.width == 0 || data.height == 0 {
            return Self::default();
        }
        let tiles = (data.width as usize).checked_mul(data.height as usize);
        if !tiles.is_some_and(|n| n <= MAX_SAVED_TILES) {
            warn!(
                "Saveable {}: implausible map size {}x{}, using defaults",
                Self::SAVE_KEY,
                data.width,
                data.height
            );
            return Self::default();
        }

        let mut system = Self::with_params(
            data.width as usize,
            data.height as usize,
            data.params.unwrap_or_default(),
        );
        system.tick = data.tick;
        for p in &data.pathways {
            let (x, y) = (p.x as usize, p.y as usize);
            if system
                .grid
                .restore_tile(x, y, p.kind, p.base_capacity, p.health)
            {
                let idx = system.grid.index(x, y);
                system.grid.tiles_mut()[idx].congested_ticks = p.congested_ticks;
            }
        }
        for r in &data.rail {
            system
                .rail
                .restore_structure(r.x as usize, r.y as usize, r.structure);
        }
        system.proximity.mark_dirty();
        system
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_distribution::DemandSource;

    fn blob(width: u32, height: u32) -> Vec<u8> {
        bitcode::encode(&TransportSaveData {
            width,
            height,
            pathways: vec![SavedPathway {
                x: 0,
                y: 0,
                kind: PathwayKind::Road,
                base_capacity: 40,
                health: 255,
                congested_ticks: 0,
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_oversized_dimensions_fall_back_to_default() {
        for (w, h) in [(1 << 20, 1 << 20), (u32::MAX, u32::MAX), (4096, 4096 + 1)] {
            let system = TransportSystem::load_from_bytes(&blob(w, h));
            assert_eq!(system.width(), GRID_WIDTH, "{w}x{h}");
            assert_eq!(system.grid().pathway_count(), 0, "{w}x{h}");
        }
    }

    #[test]
    fn test_largest_allowed_map_still_loads() {
        let system = TransportSystem::load_from_bytes(&blob(1024, 1024));
        assert_eq!(system.width(), 1024);
        assert_eq!(system.grid().pathway_count(), 1);
    }

    #[test]
    fn test_sustained_congestion_counter_survives_reload() {
        let mut system = TransportSystem::new(8, 8);
        system.place_pathway(1, 1).unwrap();
        system.add_demand_source(DemandSource::new(1, 1, 10_000));
        for _ in 0..4 {
            system.tick();
        }
        let before = system.grid().get(1, 1).congested_ticks;
        assert!(before > 0);

        let bytes = system.save_to_bytes().unwrap();
        let restored = TransportSystem::load_from_bytes(&bytes);
        assert_eq!(restored.grid().get(1, 1).congested_ticks, before);
    }
}
