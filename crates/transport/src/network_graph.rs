//! Connected-component labelling over the pathway grid.
//!
//! Components are discovered by scanning tiles in row-major order and
//! flood-filling each unvisited pathway tile with an iterative BFS, so ids
//! are deterministic for a given layout and deep networks never touch the
//! call stack.

use pathfinding::prelude::bfs_reach;

use crate::config::NO_NETWORK;
use crate::grid::{neighbors4, PathwayGrid, TilePos};

/// Label 4-connected components of the cells selected by `is_member`.
///
/// Returns one id per cell (`NO_NETWORK` for non-members) and the number of
/// components found. Ids start at 1 and follow row-major discovery order.
pub fn label_components(
    width: usize,
    height: usize,
    is_member: impl Fn(usize) -> bool,
) -> (Vec<u32>, u32) {
    let mut ids = vec![NO_NETWORK; width * height];
    let mut next_id = 0u32;

    for start in 0..width * height {
        if ids[start] != NO_NETWORK || !is_member(start) {
            continue;
        }
        next_id += 1;
        let origin = TilePos(start % width, start / width);
        let reach = bfs_reach(origin, |&TilePos(x, y)| {
            let (neighbors, count) = neighbors4(width, height, x, y);
            neighbors[..count]
                .iter()
                .filter(|&&(nx, ny)| is_member(ny * width + nx))
                .map(|&(nx, ny)| TilePos(nx, ny))
                .collect::<Vec<_>>()
        });
        for TilePos(x, y) in reach {
            ids[y * width + x] = next_id;
        }
    }

    (ids, next_id)
}

/// Component bookkeeping for the pathway grid.
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    component_count: u32,
    /// Tile count per component, indexed by `id - 1`.
    component_sizes: Vec<u32>,
    rebuilds: u64,
}

impl NetworkGraph {
    /// Recompute every tile's network id. Returns the component count.
    pub fn rebuild(&mut self, grid: &mut PathwayGrid) -> u32 {
        let (ids, count) = {
            let tiles = grid.tiles();
            label_components(grid.width(), grid.height(), |idx| tiles[idx].present)
        };

        self.component_sizes = vec![0; count as usize];
        for (tile, id) in grid.tiles_mut().iter_mut().zip(ids) {
            tile.network_id = id;
            if id != NO_NETWORK {
                self.component_sizes[id as usize - 1] += 1;
            }
        }
        self.component_count = count;
        self.rebuilds += 1;
        count
    }

    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    pub fn component_size(&self, id: u32) -> u32 {
        if id == NO_NETWORK {
            return 0;
        }
        self.component_sizes
            .get(id as usize - 1)
            .copied()
            .unwrap_or(0)
    }

    /// How many times `rebuild` has run.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}
