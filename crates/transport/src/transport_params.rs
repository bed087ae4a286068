//! Data-driven transport parameters.
//!
//! Every tuning constant the transport engine uses lives in [`TransportParams`]
//! so diffusion, cost curves and decay can be retuned without touching the
//! algorithms. Defaults reproduce the stock tuning; overrides can be loaded
//! from JSON.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid::PathwayKind;

// ---------------------------------------------------------------------------
// Penalty curves
// ---------------------------------------------------------------------------

/// Maps a 0..=255 signal (congestion level, missing health) to an additive
/// edge-cost penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub enum PenaltyCurve {
    /// Always zero.
    None,
    /// `max * input / 255`.
    Linear { max: u32 },
    /// `max * (input / 255)^2`, gentle at first and steep near saturation.
    Quadratic { max: u32 },
    /// Flat `penalty` once `input >= threshold`.
    Step { threshold: u8, penalty: u32 },
}

impl PenaltyCurve {
    #[inline]
    pub fn evaluate(self, input: u8) -> u32 {
        let input = input as u64;
        match self {
            PenaltyCurve::None => 0,
            PenaltyCurve::Linear { max } => (max as u64 * input / 255) as u32,
            PenaltyCurve::Quadratic { max } => (max as u64 * input * input / (255 * 255)) as u32,
            PenaltyCurve::Step { threshold, penalty } => {
                if input >= threshold as u64 {
                    penalty
                } else {
                    0
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pathway kind parameters
// ---------------------------------------------------------------------------

/// Base capacity per pathway kind.
#[derive(Debug, Clone, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct PathwayKindParams {
    pub trail: u32,
    pub road: u32,
    pub avenue: u32,
}

impl Default for PathwayKindParams {
    fn default() -> Self {
        Self {
            trail: 20,
            road: 40,
            avenue: 80,
        }
    }
}

impl PathwayKindParams {
    pub fn capacity(&self, kind: PathwayKind) -> u32 {
        match kind {
            PathwayKind::Trail => self.trail,
            PathwayKind::Road => self.road,
            PathwayKind::Avenue => self.avenue,
        }
    }
}

// ---------------------------------------------------------------------------
// TransportParams
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
#[serde(default)]
pub struct TransportParams {
    /// Fraction of a tile's flow pushed to its pathway neighbours each tick.
    pub spread_rate: f32,
    /// Cost of stepping onto any adjacent pathway tile before penalties.
    pub base_edge_cost: u32,
    /// Penalty curve over the destination tile's congestion level.
    pub congestion_penalty: PenaltyCurve,
    /// Penalty curve over the destination tile's missing health (255 - health).
    pub decay_penalty: PenaltyCurve,
    pub path_cache_capacity: usize,
    pub path_cache_max_age_ticks: u64,
    /// Ticks between decay passes.
    pub decay_interval_ticks: u64,
    /// Congestion at or above which a tile counts as heavily congested.
    pub decay_congestion_threshold: u8,
    /// Consecutive heavily congested ticks before decay applies to a tile.
    pub decay_sustained_ticks: u16,
    /// Health removed from a tile per decay pass.
    pub decay_amount: u8,
    /// Congestion level whose crossing (either direction) raises an event.
    pub congestion_event_threshold: u8,
    /// Contamination emitted per unit of congestion.
    pub contamination_per_congestion: f32,
    /// Congestion below this carries no land-value penalty.
    pub value_penalty_threshold: u8,
    /// Land-value penalty at congestion 255.
    pub value_penalty_max: f32,
    /// Proximity BFS stops expanding past this distance (at most 254).
    pub proximity_max_distance: u8,
    /// Manhattan radius served by an active rail terminal.
    pub terminal_service_radius: u32,
    pub pathway_kinds: PathwayKindParams,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            spread_rate: 0.5,
            base_edge_cost: 10,
            congestion_penalty: PenaltyCurve::Linear { max: 40 },
            decay_penalty: PenaltyCurve::Linear { max: 20 },
            path_cache_capacity: 256,
            path_cache_max_age_ticks: 50,
            decay_interval_ticks: 100,
            decay_congestion_threshold: 200,
            decay_sustained_ticks: 50,
            decay_amount: 8,
            congestion_event_threshold: 192,
            contamination_per_congestion: 1.0,
            value_penalty_threshold: 128,
            value_penalty_max: 30.0,
            proximity_max_distance: 64,
            terminal_service_radius: 8,
            pathway_kinds: PathwayKindParams::default(),
        }
    }
}

impl TransportParams {
    /// Parse parameters from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut params: Self = serde_json::from_str(json)?;
        params.sanitize();
        Ok(params)
    }

    /// Like [`TransportParams::from_json`] but falls back to defaults on a
    /// malformed document.
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(params) => params,
            Err(e) => {
                warn!("TransportParams: failed to parse overrides, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Clamp values into the ranges the engine relies on.
    pub fn sanitize(&mut self) {
        if !self.spread_rate.is_finite() {
            self.spread_rate = 0.0;
        }
        self.spread_rate = self.spread_rate.clamp(0.0, 1.0);
        self.base_edge_cost = self.base_edge_cost.max(1);
        self.path_cache_capacity = self.path_cache_capacity.max(1);
        self.decay_interval_ticks = self.decay_interval_ticks.max(1);
        self.proximity_max_distance = self.proximity_max_distance.min(254);
    }
}
