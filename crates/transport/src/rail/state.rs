use bevy::prelude::*;

use crate::config::NO_NETWORK;
use crate::grid::{neighbors4, PlacementError, TilePos};
use crate::network_graph::label_components;

use super::power::{AlwaysPowered, PowerProvider};
use super::types::*;

static EMPTY_RAIL: RailTile = RailTile::EMPTY;

/// Owner of the rail grid.
pub struct RailSystem {
    tiles: Vec<RailTile>,
    width: usize,
    height: usize,
    power: Box<dyn PowerProvider>,
    topology_dirty: bool,
    component_count: u32,
    /// Active terminals as of the last coverage phase.
    active_terminals: Vec<TilePos>,
    /// Deactivations caused by track removal between ticks.
    pending_changes: Vec<TerminalChange>,
}

impl RailSystem {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "rail grid must not be empty");
        Self {
            tiles: vec![RailTile::EMPTY; width * height],
            width,
            height,
            power: Box::new(AlwaysPowered),
            topology_dirty: false,
            component_count: 0,
            active_terminals: Vec::new(),
            pending_changes: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn is_in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Bounds-safe read; out-of-range positions yield an empty tile.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &RailTile {
        if self.is_in_bounds(x, y) {
            &self.tiles[self.index(x, y)]
        } else {
            &EMPTY_RAIL
        }
    }

    pub fn tiles(&self) -> &[RailTile] {
        &self.tiles
    }

    // -----------------------------------------------------------------------
    // Power provider
    // -----------------------------------------------------------------------

    pub fn set_power_provider(&mut self, provider: Box<dyn PowerProvider>) {
        self.power = provider;
    }

    /// Detach the energy subsystem; everything reads as powered again.
    pub fn clear_power_provider(&mut self) {
        self.power = Box::new(AlwaysPowered);
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    pub fn place_track(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        if !self.is_in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
        let idx = self.index(x, y);
        match self.tiles[idx].structure {
            RailStructure::Track => return Err(PlacementError::AlreadyPresent),
            RailStructure::Terminal => return Err(PlacementError::OccupiedByTerminal),
            RailStructure::Empty => {}
        }
        self.tiles[idx] = RailTile {
            structure: RailStructure::Track,
            ..RailTile::EMPTY
        };
        self.topology_dirty = true;
        Ok(())
    }

    pub fn remove_track(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        if !self.is_in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
        let idx = self.index(x, y);
        if !self.tiles[idx].is_track() {
            return Err(PlacementError::NotPresent);
        }
        self.tiles[idx] = RailTile::EMPTY;
        self.topology_dirty = true;

        // Terminals that relied on this track lose activity immediately.
        let (neighbors, count) = neighbors4(self.width, self.height, x, y);
        for &(nx, ny) in &neighbors[..count] {
            let nidx = self.index(nx, ny);
            if !self.tiles[nidx].is_terminal() {
                continue;
            }
            let still_adjacent = self.has_adjacent_active_track(nx, ny);
            let tile = &mut self.tiles[nidx];
            tile.adjacent_active_rail = still_adjacent;
            if tile.active && !still_adjacent {
                tile.active = false;
                self.active_terminals.retain(|&p| p != TilePos(nx, ny));
                self.pending_changes.push(TerminalChange {
                    pos: TilePos(nx, ny),
                    active: false,
                });
            }
        }
        Ok(())
    }

    /// Validate a terminal placement without performing it.
    pub fn can_place_terminal(&self, x: usize, y: usize) -> Result<(), PlacementError> {
        if !self.is_in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
        match self.get(x, y).structure {
            RailStructure::Track => return Err(PlacementError::OccupiedByRail),
            RailStructure::Terminal => return Err(PlacementError::OccupiedByTerminal),
            RailStructure::Empty => {}
        }
        if !self.has_adjacent_track(x, y) {
            return Err(PlacementError::NoAdjacentRail);
        }
        Ok(())
    }

    pub fn place_terminal(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.can_place_terminal(x, y)?;
        let idx = self.index(x, y);
        self.tiles[idx] = RailTile {
            structure: RailStructure::Terminal,
            ..RailTile::EMPTY
        };
        self.topology_dirty = true;
        Ok(())
    }

    pub fn remove_terminal(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        if !self.is_in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
        let idx = self.index(x, y);
        if !self.tiles[idx].is_terminal() {
            return Err(PlacementError::NotPresent);
        }
        if self.tiles[idx].active {
            self.active_terminals.retain(|&p| p != TilePos(x, y));
            self.pending_changes.push(TerminalChange {
                pos: TilePos(x, y),
                active: false,
            });
        }
        self.tiles[idx] = RailTile::EMPTY;
        self.topology_dirty = true;
        Ok(())
    }

    /// Write a structure without placement validation (save loading).
    pub(crate) fn restore_structure(&mut self, x: usize, y: usize, structure: RailStructure) -> bool {
        if !self.is_in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        self.tiles[idx] = RailTile {
            structure,
            ..RailTile::EMPTY
        };
        self.topology_dirty = true;
        true
    }

    fn has_adjacent_track(&self, x: usize, y: usize) -> bool {
        let (neighbors, count) = neighbors4(self.width, self.height, x, y);
        neighbors[..count]
            .iter()
            .any(|&(nx, ny)| self.get(nx, ny).is_track())
    }

    fn has_adjacent_active_track(&self, x: usize, y: usize) -> bool {
        let (neighbors, count) = neighbors4(self.width, self.height, x, y);
        neighbors[..count].iter().any(|&(nx, ny)| {
            let tile = self.get(nx, ny);
            tile.is_track() && tile.active
        })
    }

    // -----------------------------------------------------------------------
    // Topology
    // -----------------------------------------------------------------------

    #[inline]
    pub fn is_topology_dirty(&self) -> bool {
        self.topology_dirty
    }

    /// Relabel rail networks (track and terminals together). Returns the
    /// component count.
    pub fn rebuild_networks(&mut self) -> u32 {
        let (ids, count) = {
            let tiles = &self.tiles;
            label_components(self.width, self.height, |idx| tiles[idx].is_present())
        };
        for (tile, id) in self.tiles.iter_mut().zip(ids) {
            tile.network_id = id;
        }
        self.component_count = count;
        self.topology_dirty = false;
        count
    }

    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    pub fn is_connected(&self, a: TilePos, b: TilePos) -> bool {
        let ia = self.get(a.0, a.1).network_id;
        ia != NO_NETWORK && ia == self.get(b.0, b.1).network_id
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run the power, activation and coverage phases in order.
    pub fn tick(&mut self) -> RailTickReport {
        let mut report = RailTickReport {
            terminal_changes: std::mem::take(&mut self.pending_changes),
            ..Default::default()
        };
        if self.topology_dirty {
            let count = self.rebuild_networks();
            report.topology_rebuilt = true;
            debug!("Rail topology rebuilt: {} networks", count);
        }

        // Phase 1: power.
        for idx in 0..self.tiles.len() {
            if !self.tiles[idx].is_present() {
                continue;
            }
            let (x, y) = (idx % self.width, idx / self.width);
            let powered = self.power.is_powered_at(x, y);
            self.tiles[idx].powered = powered;
            if powered {
                report.powered_tiles += 1;
            }
        }

        // Phase 2: activation. Tracks first, terminals read the result.
        for tile in self.tiles.iter_mut().filter(|t| t.is_track()) {
            tile.active = tile.powered;
            if tile.active {
                report.active_tracks += 1;
            }
        }
        for idx in 0..self.tiles.len() {
            if !self.tiles[idx].is_terminal() {
                continue;
            }
            let (x, y) = (idx % self.width, idx / self.width);
            let adjacent = self.has_adjacent_active_track(x, y);
            let tile = &mut self.tiles[idx];
            let was_active = tile.active;
            tile.adjacent_active_rail = adjacent;
            tile.active = tile.powered && adjacent;
            if tile.active != was_active {
                report.terminal_changes.push(TerminalChange {
                    pos: TilePos(x, y),
                    active: tile.active,
                });
            }
        }

        // Phase 3: coverage. Only the active set is recorded; radius queries
        // are answered on demand.
        self.active_terminals = self
            .tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_terminal() && t.active)
            .map(|(idx, _)| TilePos(idx % self.width, idx / self.width))
            .collect();
        report.active_terminals = self.active_terminals.len() as u32;

        report
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_active_at(&self, x: usize, y: usize) -> bool {
        self.get(x, y).active
    }

    pub fn is_terminal_active_at(&self, x: usize, y: usize) -> bool {
        let tile = self.get(x, y);
        tile.is_terminal() && tile.active
    }

    pub fn active_terminals(&self) -> &[TilePos] {
        &self.active_terminals
    }

    /// Active terminals whose service radius covers `(x, y)`.
    pub fn covering_terminals(&self, x: usize, y: usize, radius: u32) -> Vec<TilePos> {
        if !self.is_in_bounds(x, y) {
            return Vec::new();
        }
        let here = TilePos(x, y);
        self.active_terminals
            .iter()
            .copied()
            .filter(|t| t.manhattan(here) <= radius)
            .collect()
    }

    pub fn is_covered_by_terminal(&self, x: usize, y: usize, radius: u32) -> bool {
        if !self.is_in_bounds(x, y) {
            return false;
        }
        let here = TilePos(x, y);
        self.active_terminals
            .iter()
            .any(|t| t.manhattan(here) <= radius)
    }

    pub fn track_count(&self) -> u32 {
        self.tiles.iter().filter(|t| t.is_track()).count() as u32
    }

    pub fn terminal_count(&self) -> u32 {
        self.tiles.iter().filter(|t| t.is_terminal()).count() as u32
    }
}
