use std::fmt;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_HEALTH, NO_NETWORK};
use crate::transport_params::PathwayKindParams;

/// Grid coordinate of a tile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct TilePos(pub usize, pub usize);

impl TilePos {
    #[inline]
    pub fn manhattan(self, other: TilePos) -> u32 {
        (self.0.abs_diff(other.0) + self.1.abs_diff(other.1)) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode, Default)]
pub enum PathwayKind {
    Trail, // footpath-grade, lowest capacity
    #[default]
    Road,
    Avenue,
}

/// Reason a placement or removal was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum PlacementError {
    OutOfBounds,
    /// The same kind of structure is already on the cell.
    AlreadyPresent,
    /// Removal target holds nothing of the requested kind.
    NotPresent,
    OccupiedByPathway,
    OccupiedByRail,
    OccupiedByTerminal,
    /// Terminals must touch at least one rail track tile.
    NoAdjacentRail,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PlacementError::OutOfBounds => "position is outside the map",
            PlacementError::AlreadyPresent => "structure already present",
            PlacementError::NotPresent => "nothing to remove at position",
            PlacementError::OccupiedByPathway => "cell is occupied by a pathway",
            PlacementError::OccupiedByRail => "cell is occupied by rail track",
            PlacementError::OccupiedByTerminal => "cell is occupied by a terminal",
            PlacementError::NoAdjacentRail => "no adjacent rail track",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for PlacementError {}

/// One cell of the pathway grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathwayTile {
    pub present: bool,
    pub kind: PathwayKind,
    pub base_capacity: u32,
    /// Always `floor(base_capacity * health / 255)`.
    pub current_capacity: u32,
    /// 0..=255, 255 = pristine.
    pub health: u8,
    pub network_id: u32,
    /// Flow accumulated this tick.
    pub flow: u32,
    pub congestion: u8,
    pub blocked: bool,
    /// Consecutive ticks at or above the decay congestion threshold.
    pub congested_ticks: u16,
}

impl PathwayTile {
    pub const EMPTY: PathwayTile = PathwayTile {
        present: false,
        kind: PathwayKind::Road,
        base_capacity: 0,
        current_capacity: 0,
        health: MAX_HEALTH,
        network_id: NO_NETWORK,
        flow: 0,
        congestion: 0,
        blocked: false,
        congested_ticks: 0,
    };

    fn fresh(kind: PathwayKind, base_capacity: u32) -> Self {
        Self {
            present: true,
            kind,
            base_capacity,
            current_capacity: base_capacity,
            ..Self::EMPTY
        }
    }

    #[inline]
    fn refresh_capacity(&mut self) {
        self.current_capacity = scaled_capacity(self.base_capacity, self.health);
    }
}

impl Default for PathwayTile {
    fn default() -> Self {
        Self::EMPTY
    }
}

static EMPTY_TILE: PathwayTile = PathwayTile::EMPTY;

/// `floor(base * health / 255)` without overflow.
#[inline]
pub fn scaled_capacity(base: u32, health: u8) -> u32 {
    (base as u64 * health as u64 / MAX_HEALTH as u64) as u32
}

/// Up to 4 cardinal neighbours in N, E, S, W order, plus the count of valid
/// entries. Use `&result[..count]`.
#[inline]
pub fn neighbors4(width: usize, height: usize, x: usize, y: usize) -> ([(usize, usize); 4], usize) {
    let mut result = [(0, 0); 4];
    let mut count = 0;
    if y > 0 {
        result[count] = (x, y - 1);
        count += 1;
    }
    if x + 1 < width {
        result[count] = (x + 1, y);
        count += 1;
    }
    if y + 1 < height {
        result[count] = (x, y + 1);
        count += 1;
    }
    if x > 0 {
        result[count] = (x - 1, y);
        count += 1;
    }
    (result, count)
}

/// Dense row-major store of pathway tiles.
///
/// Placement and removal bump `topology_version` and raise the network-dirty
/// flag; the orchestrator clears it after rebuilding connectivity.
#[derive(Debug, Clone)]
pub struct PathwayGrid {
    tiles: Vec<PathwayTile>,
    width: usize,
    height: usize,
    kinds: PathwayKindParams,
    network_dirty: bool,
    topology_version: u64,
}

impl PathwayGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_kinds(width, height, PathwayKindParams::default())
    }

    pub fn with_kinds(width: usize, height: usize, kinds: PathwayKindParams) -> Self {
        assert!(width > 0 && height > 0, "pathway grid must not be empty");
        Self {
            tiles: vec![PathwayTile::EMPTY; width * height],
            width,
            height,
            kinds,
            network_dirty: false,
            topology_version: 0,
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
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn pos_of(&self, idx: usize) -> TilePos {
        TilePos(idx % self.width, idx / self.width)
    }

    #[inline]
    pub fn is_in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Bounds-safe read; out-of-range positions yield an inert empty tile.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &PathwayTile {
        if self.is_in_bounds(x, y) {
            &self.tiles[self.index(x, y)]
        } else {
            &EMPTY_TILE
        }
    }

    #[inline]
    pub fn is_pathway(&self, x: usize, y: usize) -> bool {
        self.get(x, y).present
    }

    pub fn tiles(&self) -> &[PathwayTile] {
        &self.tiles
    }

    /// Mutable access for the per-tick passes (flow, congestion). Presence,
    /// capacity and health must go through the dedicated methods.
    pub(crate) fn tiles_mut(&mut self) -> &mut [PathwayTile] {
        &mut self.tiles
    }

    pub fn neighbors4(&self, x: usize, y: usize) -> ([(usize, usize); 4], usize) {
        neighbors4(self.width, self.height, x, y)
    }

    pub fn pathway_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.present).count()
    }

    pub fn kinds(&self) -> &PathwayKindParams {
        &self.kinds
    }

    pub fn set_kinds(&mut self, kinds: PathwayKindParams) {
        self.kinds = kinds;
    }

    // -----------------------------------------------------------------------
    // Topology mutation
    // -----------------------------------------------------------------------

    pub fn place(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        self.place_kind(x, y, PathwayKind::Road)
    }

    pub fn place_kind(&mut self, x: usize, y: usize, kind: PathwayKind) -> Result<(), PlacementError> {
        if !self.is_in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
        let idx = self.index(x, y);
        if self.tiles[idx].present {
            return Err(PlacementError::AlreadyPresent);
        }
        self.tiles[idx] = PathwayTile::fresh(kind, self.kinds.capacity(kind));
        self.mark_topology_changed();
        Ok(())
    }

    pub fn remove(&mut self, x: usize, y: usize) -> Result<(), PlacementError> {
        if !self.is_in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
        let idx = self.index(x, y);
        if !self.tiles[idx].present {
            return Err(PlacementError::NotPresent);
        }
        self.tiles[idx] = PathwayTile::EMPTY;
        self.mark_topology_changed();
        Ok(())
    }

    fn mark_topology_changed(&mut self) {
        self.network_dirty = true;
        self.topology_version = self.topology_version.wrapping_add(1);
    }

    #[inline]
    pub fn is_network_dirty(&self) -> bool {
        self.network_dirty
    }

    pub(crate) fn clear_network_dirty(&mut self) {
        self.network_dirty = false;
    }

    /// Monotonic counter bumped by every placement or removal.
    #[inline]
    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    // -----------------------------------------------------------------------
    // Capacity / health mutation
    // -----------------------------------------------------------------------

    /// Apply `f` to a present tile and refresh its capacity. Returns `false`
    /// when there is no pathway at the position.
    fn with_present_tile(&mut self, x: usize, y: usize, f: impl FnOnce(&mut PathwayTile)) -> bool {
        if !self.is_in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        let tile = &mut self.tiles[idx];
        if !tile.present {
            return false;
        }
        f(tile);
        tile.refresh_capacity();
        true
    }

    pub fn set_health(&mut self, x: usize, y: usize, health: u8) -> bool {
        self.with_present_tile(x, y, |t| t.health = health)
    }

    pub fn damage(&mut self, x: usize, y: usize, amount: u8) -> bool {
        self.with_present_tile(x, y, |t| t.health = t.health.saturating_sub(amount))
    }

    pub fn repair(&mut self, x: usize, y: usize, amount: u8) -> bool {
        self.with_present_tile(x, y, |t| t.health = t.health.saturating_add(amount))
    }

    pub fn set_base_capacity(&mut self, x: usize, y: usize, base_capacity: u32) -> bool {
        self.with_present_tile(x, y, |t| t.base_capacity = base_capacity)
    }

    /// Restore a tile wholesale (used by save loading). Marks topology dirty.
    pub(crate) fn restore_tile(
        &mut self,
        x: usize,
        y: usize,
        kind: PathwayKind,
        base_capacity: u32,
        health: u8,
    ) -> bool {
        if !self.is_in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        let mut tile = PathwayTile::fresh(kind, base_capacity);
        tile.health = health;
        tile.refresh_capacity();
        self.tiles[idx] = tile;
        self.mark_topology_changed();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GRID_HEIGHT, GRID_WIDTH};

    #[test]
    fn test_out_of_bounds_get_is_inert() {
        let grid = PathwayGrid::new(16, 16);
        let tile = grid.get(16, 0);
        assert!(!tile.present);
        assert_eq!(tile.network_id, NO_NETWORK);
        assert_eq!(tile.flow, 0);
        assert!(!grid.is_in_bounds(0, 16));
        assert!(!grid.get(usize::MAX, usize::MAX).present);
    }

    #[test]
    fn test_place_and_remove_mark_dirty() {
        let mut grid = PathwayGrid::new(GRID_WIDTH, GRID_HEIGHT);
        assert!(!grid.is_network_dirty());
        grid.place(10, 10).unwrap();
        assert!(grid.is_network_dirty());
        assert_eq!(grid.topology_version(), 1);
        grid.clear_network_dirty();
        grid.remove(10, 10).unwrap();
        assert!(grid.is_network_dirty());
        assert_eq!(grid.topology_version(), 2);
        assert!(!grid.get(10, 10).present);
    }

    #[test]
    fn test_place_rejects_duplicates_and_out_of_bounds() {
        let mut grid = PathwayGrid::new(8, 8);
        grid.place(1, 1).unwrap();
        assert_eq!(grid.place(1, 1), Err(PlacementError::AlreadyPresent));
        assert_eq!(grid.place(8, 1), Err(PlacementError::OutOfBounds));
        assert_eq!(grid.remove(2, 2), Err(PlacementError::NotPresent));
        assert_eq!(grid.topology_version(), 1);
    }

    #[test]
    fn test_capacity_tracks_health() {
        let mut grid = PathwayGrid::new(8, 8);
        grid.place_kind(3, 3, PathwayKind::Avenue).unwrap();
        let base = grid.get(3, 3).base_capacity;
        assert_eq!(grid.get(3, 3).current_capacity, base);

        for health in [0u8, 1, 64, 127, 128, 200, 254, 255] {
            grid.set_health(3, 3, health);
            let tile = grid.get(3, 3);
            assert_eq!(
                tile.current_capacity,
                (tile.base_capacity as u64 * health as u64 / 255) as u32
            );
        }
    }

    #[test]
    fn test_damage_and_repair_saturate() {
        let mut grid = PathwayGrid::new(8, 8);
        grid.place(0, 0).unwrap();
        grid.damage(0, 0, 200);
        grid.damage(0, 0, 200);
        assert_eq!(grid.get(0, 0).health, 0);
        assert_eq!(grid.get(0, 0).current_capacity, 0);
        grid.repair(0, 0, 255);
        assert_eq!(grid.get(0, 0).health, 255);
        assert_eq!(grid.get(0, 0).current_capacity, grid.get(0, 0).base_capacity);
    }

    #[test]
    fn test_health_mutation_on_empty_tile_is_noop() {
        let mut grid = PathwayGrid::new(8, 8);
        assert!(!grid.set_health(2, 2, 10));
        assert!(!grid.set_base_capacity(9, 9, 10));
        assert_eq!(grid.get(2, 2).health, MAX_HEALTH);
    }

    #[test]
    fn test_set_base_capacity_refreshes_current() {
        let mut grid = PathwayGrid::new(8, 8);
        grid.place(4, 4).unwrap();
        grid.set_health(4, 4, 51);
        grid.set_base_capacity(4, 4, 100);
        assert_eq!(grid.get(4, 4).current_capacity, 20);
    }

    #[test]
    fn test_neighbors_scan_order() {
        let (n, count) = neighbors4(10, 10, 5, 5);
        assert_eq!(count, 4);
        assert_eq!(&n[..count], &[(5, 4), (6, 5), (5, 6), (4, 5)]);
        assert_eq!(neighbors4(10, 10, 0, 0).1, 2);
        assert_eq!(neighbors4(10, 10, 9, 9).1, 2);
    }
}
