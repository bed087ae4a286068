//! Injects building demand onto the pathway network.
//!
//! Each demand source is attached to its nearest pathway tile. The proximity
//! field gives the exact search radius, then a bounded BFS from the source
//! picks the tile. Neighbours are scanned N, E, S, W so equidistant ties
//! resolve the same way on every run.

use bitcode::{Decode, Encode};
use pathfinding::prelude::bfs;
use serde::{Deserialize, Serialize};

use crate::config::PROXIMITY_UNREACHED;
use crate::grid::{neighbors4, PathwayGrid, TilePos};
use crate::proximity::ProximityCache;

/// A building's traffic demand for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct DemandSource {
    pub x: usize,
    pub y: usize,
    pub flow: u32,
}

impl DemandSource {
    pub fn new(x: usize, y: usize, flow: u32) -> Self {
        Self { x, y, flow }
    }
}

/// Outcome counters for one distribution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionReport {
    /// Sources attached to a pathway tile.
    pub attached: u32,
    /// Sources with no pathway in reach (expected, not an error).
    pub skipped: u32,
    pub injected_flow: u64,
}

/// Nearest pathway tile to `(x, y)`, or `None` when the proximity field says
/// nothing is in reach.
///
/// `proximity` must be current for `grid`; a stale field can only shrink the
/// search and never yields a non-pathway tile.
pub fn nearest_pathway(
    grid: &PathwayGrid,
    proximity: &ProximityCache,
    x: usize,
    y: usize,
) -> Option<TilePos> {
    if !grid.is_in_bounds(x, y) {
        return None;
    }
    let radius = proximity.distance(x, y);
    if radius == PROXIMITY_UNREACHED {
        return None;
    }

    let origin = TilePos(x, y);
    let (w, h) = (grid.width(), grid.height());
    let path = bfs(
        &origin,
        |&TilePos(cx, cy)| {
            let (neighbors, count) = neighbors4(w, h, cx, cy);
            neighbors[..count]
                .iter()
                .map(|&(nx, ny)| TilePos(nx, ny))
                .filter(|p| p.manhattan(origin) <= radius as u32)
                .collect::<Vec<_>>()
        },
        |&TilePos(cx, cy)| grid.is_pathway(cx, cy),
    )?;
    path.last().copied()
}

/// Add every source's flow to its nearest pathway tile's accumulator.
pub fn distribute_flow(
    grid: &mut PathwayGrid,
    proximity: &ProximityCache,
    sources: &[DemandSource],
) -> DistributionReport {
    let mut report = DistributionReport::default();

    for source in sources {
        if source.flow == 0 {
            continue;
        }
        let Some(TilePos(tx, ty)) = nearest_pathway(grid, proximity, source.x, source.y) else {
            report.skipped += 1;
            continue;
        };
        let idx = grid.index(tx, ty);
        let tile = &mut grid.tiles_mut()[idx];
        tile.flow = tile.flow.saturating_add(source.flow);
        report.attached += 1;
        report.injected_flow += source.flow as u64;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(cells: &[(usize, usize)]) -> (PathwayGrid, ProximityCache) {
        let mut grid = PathwayGrid::new(20, 20);
        for &(x, y) in cells {
            grid.place(x, y).unwrap();
        }
        let mut proximity = ProximityCache::new(20, 20);
        proximity.rebuild(&grid, 64);
        (grid, proximity)
    }

    #[test]
    fn test_source_on_pathway_attaches_to_itself() {
        let (grid, proximity) = setup(&[(5, 5)]);
        assert_eq!(nearest_pathway(&grid, &proximity, 5, 5), Some(TilePos(5, 5)));
    }

    #[test]
    fn test_nearest_picks_closest_tile() {
        let (grid, proximity) = setup(&[(2, 10), (10, 10)]);
        assert_eq!(nearest_pathway(&grid, &proximity, 8, 10), Some(TilePos(10, 10)));
        assert_eq!(nearest_pathway(&grid, &proximity, 4, 10), Some(TilePos(2, 10)));
    }

    #[test]
    fn test_tie_prefers_north_then_east() {
        // (5,4) is north, (6,5) is east; both at distance 1.
        let (grid, proximity) = setup(&[(6, 5), (5, 4), (5, 6), (4, 5)]);
        assert_eq!(nearest_pathway(&grid, &proximity, 5, 5), Some(TilePos(5, 4)));

        let (grid, proximity) = setup(&[(6, 5), (5, 6), (4, 5)]);
        assert_eq!(nearest_pathway(&grid, &proximity, 5, 5), Some(TilePos(6, 5)));
    }

    #[test]
    fn test_no_pathway_skips_silently() {
        let (mut grid, proximity) = setup(&[]);
        let report = distribute_flow(&mut grid, &proximity, &[DemandSource::new(3, 3, 50)]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.attached, 0);
        assert!(grid.tiles().iter().all(|t| t.flow == 0));
    }

    #[test]
    fn test_out_of_bounds_source_skipped() {
        let (mut grid, proximity) = setup(&[(1, 1)]);
        let report = distribute_flow(&mut grid, &proximity, &[DemandSource::new(50, 50, 10)]);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_sources_accumulate_on_shared_tile() {
        let (mut grid, proximity) = setup(&[(10, 10)]);
        let sources = [
            DemandSource::new(10, 12, 30),
            DemandSource::new(11, 10, 20),
            DemandSource::new(10, 10, 5),
        ];
        let report = distribute_flow(&mut grid, &proximity, &sources);
        assert_eq!(report.attached, 3);
        assert_eq!(report.injected_flow, 55);
        assert_eq!(grid.get(10, 10).flow, 55);
    }

    #[test]
    fn test_search_finds_tile_at_exact_radius() {
        let (grid, proximity) = setup(&[(0, 0)]);
        assert_eq!(proximity.distance(7, 9), 16);
        assert_eq!(nearest_pathway(&grid, &proximity, 7, 9), Some(TilePos(0, 0)));
    }
}
