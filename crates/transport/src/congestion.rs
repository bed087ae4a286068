//! Congestion, blockage and the derived contamination / land-value signals.
//!
//! Congestion is `255 * flow / max(capacity, 1)` clamped to 0..=255, so a
//! zero-capacity tile under any load reads as fully congested instead of
//! dividing by zero. The derived signals are pure functions of the current
//! congestion level and are recomputed on demand.

use crate::grid::{PathwayGrid, PathwayTile, TilePos};
use crate::transport_params::TransportParams;

/// Normalised congestion for a flow/capacity pair.
#[inline]
pub fn congestion_level(flow: u32, capacity: u32) -> u8 {
    let scaled = 255u64 * flow as u64 / capacity.max(1) as u64;
    scaled.min(255) as u8
}

/// A tile with no remaining capacity that still receives flow.
#[inline]
pub fn is_blocked(flow: u32, capacity: u32) -> bool {
    capacity == 0 && flow > 0
}

/// Contamination emitted by a tile at the given congestion level.
pub fn contamination_rate(congestion: u8, params: &TransportParams) -> f32 {
    congestion as f32 * params.contamination_per_congestion.max(0.0)
}

/// Land-value penalty for cells served by a tile at the given congestion.
/// Zero below `value_penalty_threshold`, rising linearly to
/// `value_penalty_max` at 255.
pub fn value_penalty(congestion: u8, params: &TransportParams) -> f32 {
    let threshold = params.value_penalty_threshold;
    if congestion < threshold {
        return 0.0;
    }
    if threshold == u8::MAX {
        return params.value_penalty_max;
    }
    let span = (u8::MAX - threshold) as f32;
    params.value_penalty_max * (congestion - threshold) as f32 / span
}

/// A tile whose congestion moved across the event threshold this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdCrossing {
    pub pos: TilePos,
    pub congestion: u8,
    /// `true` when the tile became congested, `false` when it cleared.
    pub rising: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CongestionReport {
    pub congested_tiles: u32,
    pub blocked_tiles: u32,
    pub crossings: Vec<ThresholdCrossing>,
}

fn update_tile(tile: &mut PathwayTile, params: &TransportParams) -> u8 {
    let previous = tile.congestion;
    tile.congestion = congestion_level(tile.flow, tile.current_capacity);
    tile.blocked = is_blocked(tile.flow, tile.current_capacity);
    if tile.congestion >= params.decay_congestion_threshold {
        tile.congested_ticks = tile.congested_ticks.saturating_add(1);
    } else {
        tile.congested_ticks = 0;
    }
    previous
}

/// Recompute congestion and blockage for every pathway tile.
pub fn update_congestion(grid: &mut PathwayGrid, params: &TransportParams) -> CongestionReport {
    let width = grid.width();
    let threshold = params.congestion_event_threshold;
    let mut report = CongestionReport::default();

    for (idx, tile) in grid.tiles_mut().iter_mut().enumerate() {
        if !tile.present {
            tile.congestion = 0;
            tile.blocked = false;
            tile.congested_ticks = 0;
            continue;
        }
        let previous = update_tile(tile, params);

        if tile.congestion >= threshold {
            report.congested_tiles += 1;
        }
        if tile.blocked {
            report.blocked_tiles += 1;
        }
        let was_over = previous >= threshold;
        let is_over = tile.congestion >= threshold;
        if was_over != is_over {
            report.crossings.push(ThresholdCrossing {
                pos: TilePos(idx % width, idx / width),
                congestion: tile.congestion,
                rising: is_over,
            });
        }
    }

    report
}
