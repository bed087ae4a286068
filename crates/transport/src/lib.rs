//! Tick-driven surface transport for a colony map: a pathway grid with
//! flow, congestion and decay, plus a powered rail network with terminals.

use bevy::prelude::*;

pub mod config;
pub mod congestion;
pub mod edge_cost;
pub mod flow_distribution;
pub mod flow_propagation;
pub mod grid;
pub mod network_graph;
pub mod path_cache;
pub mod pathfinding_sys;
pub mod proximity;
pub mod rail;
pub mod simulation_sets;
pub mod transport_params;
pub mod transport_system;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use flow_distribution::DemandSource;
pub use grid::{PathwayKind, PlacementError, TilePos};
pub use pathfinding_sys::Path;
pub use rail::{AlwaysPowered, PowerMask, PowerProvider};
pub use transport_params::{PenaltyCurve, TransportParams};
pub use transport_system::{
    DemandSources, TransportEvent, TransportPlugin, TransportProvider, TransportSnapshot,
    TransportStats, TransportSystem,
};

// ---------------------------------------------------------------------------
// Saveable trait
// ---------------------------------------------------------------------------

/// Resources that persist through the save file's extension map.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Unique key in the extension map. Must stay stable across versions.
    const SAVE_KEY: &'static str;

    /// Serialize this resource. `None` skips saving (e.g. default state).
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Decode bytes via `bitcode::decode`, logging a warning and returning
/// `Default` on failure.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    match bitcode::decode(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Saveable {}: failed to decode {} bytes, falling back to default: {}",
                key,
                bytes.len(),
                e
            );
            T::default()
        }
    }
}

#[cfg(test)]
mod saveable_tests {
    use super::*;

    #[test]
    fn test_decode_or_warn_garbage_falls_back() {
        let value: u64 = decode_or_warn("empty", &[]);
        assert_eq!(value, 0);
    }

    #[test]
    fn test_decode_or_warn_valid_bytes() {
        let bytes = bitcode::encode(&vec![3u32, 4, 5]);
        let value: Vec<u32> = decode_or_warn("valid", &bytes);
        assert_eq!(value, vec![3, 4, 5]);
    }
}
