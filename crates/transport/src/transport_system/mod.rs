//! Per-tick transport orchestrator and the query façade other subsystems use.
//!
//! ## Tick order
//! 1. Rebuild network ids and the proximity field if the grid is dirty, and
//!    bump the path-cache topology version
//! 2. Clear every tile's flow
//! 3. Inject demand onto the nearest pathway tiles
//! 4. Diffuse flow once
//! 5. Recompute congestion and blockage
//! 6. Every `decay_interval_ticks`, wear down tiles under sustained congestion
//! 7. Run the rail phases, then publish this tick's events
//!
//! Events from the previous tick are dropped when the next tick starts, so
//! each one is visible for exactly one read window.

mod events;
mod plugin;
mod queries;
mod snapshot;
mod system;


pub use events::TransportEvent;
pub use plugin::{tick_transport, DemandSources, TransportPlugin};
pub use queries::TransportProvider;
pub use snapshot::{PathwayRecord, RailRecord, TransportSnapshot, TransportStats};
pub use system::TransportSystem;
