//! Secondary rail network: track, terminals and their power/activation state.
//!
//! ## Data model
//! - `RailTile`: one cell of the rail grid (track or terminal, network id,
//!   power and activity flags)
//! - `RailSystem`: owns the rail grid, labels rail networks, and runs the
//!   per-tick power -> activation -> coverage phases
//! - `PowerProvider`: the energy subsystem's view, injected; without one the
//!   rail network is treated as powered
//!
//! A terminal is active only while it is powered and touches at least one
//! active track tile.

mod power;
mod state;
mod types;


pub use power::{AlwaysPowered, PowerMask, PowerProvider};
pub use state::RailSystem;
pub use types::*;
