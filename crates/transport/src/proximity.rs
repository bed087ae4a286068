//! Distance-to-nearest-pathway field.
//!
//! A multi-source BFS seeded from every pathway tile at once writes the
//! 4-connected step distance to the closest pathway into each cell. Cells the
//! BFS never reaches (empty map, or beyond `max_distance`) keep
//! [`PROXIMITY_UNREACHED`].
//!
//! The field is not refreshed on read. Grid mutations raise the dirty flag
//! and the owner must call [`ProximityCache::rebuild`] before relying on it.

use std::collections::VecDeque;

use crate::config::PROXIMITY_UNREACHED;
use crate::grid::{neighbors4, PathwayGrid};

#[derive(Debug, Clone)]
pub struct ProximityCache {
    distances: Vec<u8>,
    width: usize,
    height: usize,
    dirty: bool,
    /// Grid topology version the field was last built from.
    built_version: Option<u64>,
}

impl ProximityCache {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            distances: vec![PROXIMITY_UNREACHED; width * height],
            width,
            height,
            dirty: true,
            built_version: None,
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// True when the field was built from the grid's current topology.
    pub fn is_current_for(&self, grid: &PathwayGrid) -> bool {
        !self.dirty && self.built_version == Some(grid.topology_version())
    }

    /// Bounds-safe distance lookup; out-of-range cells report unreached.
    #[inline]
    pub fn distance(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height {
            self.distances[y * self.width + x]
        } else {
            PROXIMITY_UNREACHED
        }
    }

    pub fn distances(&self) -> &[u8] {
        &self.distances
    }

    /// Recompute the whole field and clear the dirty flag.
    pub fn rebuild(&mut self, grid: &PathwayGrid, max_distance: u8) {
        assert_eq!(
            (self.width, self.height),
            (grid.width(), grid.height()),
            "proximity cache and pathway grid dimensions differ"
        );
        let max_distance = max_distance.min(PROXIMITY_UNREACHED - 1);
        let w = self.width;
        let h = self.height;

        self.distances.fill(PROXIMITY_UNREACHED);
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

        for (idx, tile) in grid.tiles().iter().enumerate() {
            if tile.present {
                self.distances[idx] = 0;
                queue.push_back((idx % w, idx / w));
            }
        }

        while let Some((x, y)) = queue.pop_front() {
            let dist = self.distances[y * w + x];
            if dist >= max_distance {
                continue;
            }
            let (neighbors, ncount) = neighbors4(w, h, x, y);
            for &(nx, ny) in &neighbors[..ncount] {
                let nidx = ny * w + nx;
                if self.distances[nidx] == PROXIMITY_UNREACHED {
                    self.distances[nidx] = dist + 1;
                    queue.push_back((nx, ny));
                }
            }
        }

        self.dirty = false;
        self.built_version = Some(grid.topology_version());
    }
}
