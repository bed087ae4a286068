//! Ordering phases for systems in the `FixedUpdate` schedule.
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – Producers of per-tick input. Zone and building systems
//!   refresh `DemandSources` here.
//! * **Simulation** – The transport tick itself.
//! * **PostSim** – Readers of transport results: overlays, stats and
//!   anything consuming `TransportEvent`s.

use bevy::prelude::*;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
///
/// Configured as a chain: `PreSim` → `Simulation` → `PostSim`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Per-tick input: demand refresh, placement requests.
    PreSim,
    /// Flow, congestion, decay and rail updates.
    Simulation,
    /// Aggregation and event consumers. Never mutates transport state.
    PostSim,
}
