use crate::config::MAX_HEALTH;
use crate::grid::PathwayTile;
use crate::transport_params::{PenaltyCurve, TransportParams};

/// Cost of stepping onto a pathway tile.
///
/// `base + congestion_penalty(congestion) + decay_penalty(255 - health)`,
/// always at least `base`, which keeps the Manhattan heuristic admissible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCost {
    base: u32,
    congestion: PenaltyCurve,
    decay: PenaltyCurve,
}

impl Default for EdgeCost {
    fn default() -> Self {
        Self::from_params(&TransportParams::default())
    }
}

impl EdgeCost {
    pub fn new(base: u32, congestion: PenaltyCurve, decay: PenaltyCurve) -> Self {
        Self {
            base: base.max(1),
            congestion,
            decay,
        }
    }

    pub fn from_params(params: &TransportParams) -> Self {
        Self::new(
            params.base_edge_cost,
            params.congestion_penalty,
            params.decay_penalty,
        )
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Cost of entering `destination` from any adjacent pathway tile.
    #[inline]
    pub fn cost_into(&self, destination: &PathwayTile) -> u32 {
        self.base
            .saturating_add(self.congestion.evaluate(destination.congestion))
            .saturating_add(self.decay.evaluate(MAX_HEALTH - destination.health))
    }

    /// Lower bound on the cost between two tiles `distance` steps apart.
    #[inline]
    pub fn heuristic(&self, distance: u32) -> u64 {
        distance as u64 * self.base as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(congestion: u8, health: u8) -> PathwayTile {
        PathwayTile {
            present: true,
            congestion,
            health,
            ..PathwayTile::EMPTY
        }
    }

    #[test]
    fn test_pristine_free_tile_costs_base() {
        let cost = EdgeCost::default();
        assert_eq!(cost.cost_into(&tile(0, 255)), 10);
    }

    #[test]
    fn test_penalties_add_up() {
        let cost = EdgeCost::new(
            10,
            PenaltyCurve::Linear { max: 40 },
            PenaltyCurve::Linear { max: 20 },
        );
        assert_eq!(cost.cost_into(&tile(255, 255)), 50);
        assert_eq!(cost.cost_into(&tile(0, 0)), 30);
        assert_eq!(cost.cost_into(&tile(255, 0)), 70);
    }

    #[test]
    fn test_cost_never_below_base() {
        let cost = EdgeCost::new(3, PenaltyCurve::None, PenaltyCurve::None);
        for c in [0u8, 100, 255] {
            for h in [0u8, 100, 255] {
                assert!(cost.cost_into(&tile(c, h)) >= cost.base());
            }
        }
    }

    #[test]
    fn test_zero_base_is_raised_to_one() {
        let cost = EdgeCost::new(0, PenaltyCurve::None, PenaltyCurve::None);
        assert_eq!(cost.base(), 1);
        assert_eq!(cost.heuristic(5), 5);
    }
}
