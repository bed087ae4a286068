//! Single-pass flow diffusion along the pathway network.
//!
//! Each pass reads a snapshot of the flow values as they were when the pass
//! started and writes into a fresh buffer, so the result does not depend on
//! tile visiting order. A tile keeps `1 - spread_rate` of its flow and splits
//! the rest evenly between its pathway neighbours. Integer remainders stay on
//! the originating tile, which keeps the pass exactly conservative.
//!
//! One pass runs per tick and never iterates towards a steady state;
//! congestion and decay tuning assume this magnitude.

use crate::grid::PathwayGrid;

/// Totals for one diffusion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub total_before: u64,
    pub total_after: u64,
    /// Flow that moved from a tile to a neighbour.
    pub moved: u64,
}

const PPM: u64 = 1_000_000;

/// Spread rate as an integer fraction of a million. Rounding here keeps rates
/// such as 0.7, which are inexact in `f32`, from losing a unit on the floor.
fn spread_parts_per_million(spread_rate: f32) -> u64 {
    if !spread_rate.is_finite() {
        return 0;
    }
    (spread_rate.clamp(0.0, 1.0) as f64 * PPM as f64).round() as u64
}

/// Diffuse flow once across the grid.
pub fn propagate_flow(grid: &mut PathwayGrid, spread_rate: f32) -> PropagationReport {
    let rate_ppm = spread_parts_per_million(spread_rate);
    let (w, h) = (grid.width(), grid.height());
    let snapshot: Vec<u32> = grid.tiles().iter().map(|t| t.flow).collect();
    let mut next = vec![0u32; snapshot.len()];
    let mut report = PropagationReport::default();

    {
        let tiles = grid.tiles();
        for (idx, &flow) in snapshot.iter().enumerate() {
            if flow == 0 || !tiles[idx].present {
                continue;
            }
            report.total_before += flow as u64;

            let (neighbors, ncount) = crate::grid::neighbors4(w, h, idx % w, idx / w);
            let mut targets = [0usize; 4];
            let mut tcount = 0;
            for &(nx, ny) in &neighbors[..ncount] {
                let nidx = ny * w + nx;
                if tiles[nidx].present {
                    targets[tcount] = nidx;
                    tcount += 1;
                }
            }

            if tcount == 0 {
                next[idx] = next[idx].saturating_add(flow);
                continue;
            }

            let spread = (flow as u64 * rate_ppm / PPM) as u32;
            let share = spread / tcount as u32;
            let retained = flow - share * tcount as u32;
            next[idx] = next[idx].saturating_add(retained);
            for &nidx in &targets[..tcount] {
                next[nidx] = next[nidx].saturating_add(share);
            }
            report.moved += share as u64 * tcount as u64;
        }
    }

    for (tile, flow) in grid.tiles_mut().iter_mut().zip(next) {
        tile.flow = flow;
        report.total_after += flow as u64;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn line_grid(len: usize) -> PathwayGrid {
        let mut grid = PathwayGrid::new(16, 4);
        for x in 0..len {
            grid.place(x, 1).unwrap();
        }
        grid
    }

    fn set_flow(grid: &mut PathwayGrid, x: usize, y: usize, flow: u32) {
        let idx = grid.index(x, y);
        grid.tiles_mut()[idx].flow = flow;
    }

    #[test]
    fn test_end_of_line_pushes_half_to_first_neighbor() {
        let mut grid = line_grid(5);
        set_flow(&mut grid, 0, 1, 100);
        propagate_flow(&mut grid, 0.5);
        assert_eq!(grid.get(0, 1).flow, 50);
        assert_eq!(grid.get(1, 1).flow, 50);
        assert_eq!(grid.get(2, 1).flow, 0);
    }

    #[test]
    fn test_middle_tile_splits_between_two_neighbors() {
        let mut grid = line_grid(5);
        set_flow(&mut grid, 2, 1, 100);
        propagate_flow(&mut grid, 0.5);
        assert_eq!(grid.get(1, 1).flow, 25);
        assert_eq!(grid.get(2, 1).flow, 50);
        assert_eq!(grid.get(3, 1).flow, 25);
    }

    #[test]
    fn test_inexact_rates_keep_the_complement() {
        for (rate, moved) in [(0.7f32, 70u32), (0.3, 30), (0.1, 10)] {
            let mut grid = line_grid(2);
            set_flow(&mut grid, 0, 1, 100);
            propagate_flow(&mut grid, rate);
            assert_eq!(grid.get(1, 1).flow, moved, "rate {rate}");
            assert_eq!(grid.get(0, 1).flow, 100 - moved, "rate {rate}");
        }
    }

    #[test]
    fn test_isolated_tile_retains_flow() {
        let mut grid = PathwayGrid::new(8, 8);
        grid.place(3, 3).unwrap();
        set_flow(&mut grid, 3, 3, 77);
        propagate_flow(&mut grid, 0.9);
        assert_eq!(grid.get(3, 3).flow, 77);
    }

    #[test]
    fn test_remainder_stays_on_origin() {
        let mut grid = line_grid(5);
        set_flow(&mut grid, 2, 1, 7);
        // spread = floor(3.5) = 3, share = 1 each, retained = 5
        propagate_flow(&mut grid, 0.5);
        assert_eq!(grid.get(1, 1).flow, 1);
        assert_eq!(grid.get(2, 1).flow, 5);
        assert_eq!(grid.get(3, 1).flow, 1);
    }

    #[test]
    fn test_single_pass_is_order_independent() {
        // Two adjacent loaded tiles exchange from the snapshot, not from
        // partially updated values.
        let mut grid = line_grid(2);
        set_flow(&mut grid, 0, 1, 100);
        set_flow(&mut grid, 1, 1, 100);
        propagate_flow(&mut grid, 0.5);
        assert_eq!(grid.get(0, 1).flow, 100);
        assert_eq!(grid.get(1, 1).flow, 100);
    }

    #[test]
    fn test_zero_rate_is_identity() {
        let mut grid = line_grid(5);
        set_flow(&mut grid, 1, 1, 40);
        let report = propagate_flow(&mut grid, 0.0);
        assert_eq!(grid.get(1, 1).flow, 40);
        assert_eq!(report.moved, 0);
    }

    #[test]
    fn test_conserves_total_on_random_networks() {
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        for _ in 0..20 {
            let mut grid = PathwayGrid::new(16, 16);
            for _ in 0..120 {
                let _ = grid.place(rng.gen_range(0..16), rng.gen_range(0..16));
            }
            for idx in 0..grid.tiles().len() {
                if grid.tiles()[idx].present {
                    grid.tiles_mut()[idx].flow = rng.gen_range(0..10_000);
                }
            }
            let before: u64 = grid.tiles().iter().map(|t| t.flow as u64).sum();
            let rate = rng.gen_range(0.0..=1.0);
            let report = propagate_flow(&mut grid, rate);
            let after: u64 = grid.tiles().iter().map(|t| t.flow as u64).sum();
            assert_eq!(before, after, "diffusion must conserve flow (rate {rate})");
            assert_eq!(report.total_before, report.total_after);
        }
    }

    #[test]
    fn test_flow_never_leaves_pathway_tiles() {
        let mut grid = line_grid(3);
        set_flow(&mut grid, 1, 1, 90);
        propagate_flow(&mut grid, 1.0);
        for (idx, tile) in grid.tiles().iter().enumerate() {
            if !tile.present {
                assert_eq!(tile.flow, 0, "non-pathway tile {idx} received flow");
            }
        }
    }
}
