//! # TestColony: headless integration test harness for the transport plugin
//!
//! Wraps a `bevy::app::App` with `MinimalPlugins` + `TransportPlugin` so
//! scenarios can be built fluently and advanced tick by tick without a window.

use bevy::app::App;
use bevy::prelude::*;

use crate::flow_distribution::DemandSource;
use crate::grid::{PathwayKind, TilePos};
use crate::rail::PowerProvider;
use crate::transport_system::{DemandSources, TransportEvent, TransportPlugin, TransportSystem};

pub struct TestColony {
    app: App,
}

impl Default for TestColony {
    fn default() -> Self {
        Self::new()
    }
}

impl TestColony {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// An empty 256x256 colony.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(TransportPlugin);
        // Run one update so Startup systems execute.
        app.update();
        Self { app }
    }

    /// An empty colony of the given size.
    pub fn with_size(width: usize, height: usize) -> Self {
        let mut colony = Self::new();
        colony
            .app
            .insert_resource(TransportSystem::new(width, height));
        colony
    }

    // -----------------------------------------------------------------------
    // World setup (builder pattern, consumes and returns Self)
    // -----------------------------------------------------------------------

    /// Straight pathway from (x0,y0) to (x1,y1). The segment must be
    /// horizontal or vertical; already-present tiles are skipped.
    pub fn with_pathway(self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        self.with_pathway_kind(x0, y0, x1, y1, PathwayKind::Road)
    }

    pub fn with_pathway_kind(
        mut self,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
        kind: PathwayKind,
    ) -> Self {
        let mut transport = self.transport_mut();
        for TilePos(x, y) in line(x0, y0, x1, y1) {
            let _ = transport.place_pathway_kind(x, y, kind);
        }
        drop(transport);
        self
    }

    /// Straight rail track, same rules as [`TestColony::with_pathway`].
    pub fn with_rail(mut self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        let mut transport = self.transport_mut();
        for TilePos(x, y) in line(x0, y0, x1, y1) {
            let _ = transport.place_rail(x, y);
        }
        drop(transport);
        self
    }

    /// Place a terminal. Panics if placement is rejected.
    pub fn with_terminal(mut self, x: usize, y: usize) -> Self {
        let result = self.transport_mut().place_terminal(x, y);
        assert!(result.is_ok(), "terminal at ({x}, {y}) rejected: {result:?}");
        self
    }

    pub fn with_demand(mut self, x: usize, y: usize, flow: u32) -> Self {
        self.demand_mut().sources.push(DemandSource::new(x, y, flow));
        self
    }

    pub fn with_power(mut self, provider: impl PowerProvider + 'static) -> Self {
        self.transport_mut().set_power_provider(Box::new(provider));
        self
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run the `FixedUpdate` schedule `n` times.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn transport(&self) -> &TransportSystem {
        self.resource::<TransportSystem>()
    }

    pub fn transport_mut(&mut self) -> Mut<'_, TransportSystem> {
        self.app.world_mut().resource_mut::<TransportSystem>()
    }

    pub fn demand_mut(&mut self) -> Mut<'_, DemandSources> {
        self.app.world_mut().resource_mut::<DemandSources>()
    }

    /// Every `TransportEvent` sent since the harness was created.
    pub fn events(&self) -> Vec<TransportEvent> {
        let events = self.resource::<Events<TransportEvent>>();
        let mut cursor = events.get_cursor();
        cursor.read(events).copied().collect()
    }

    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_connected(&self, a: (usize, usize), b: (usize, usize)) {
        let grid = self.transport().grid();
        let ia = grid.get(a.0, a.1).network_id;
        let ib = grid.get(b.0, b.1).network_id;
        assert!(
            ia != 0 && ia == ib,
            "expected {a:?} and {b:?} to share a network, got ids {ia} and {ib}"
        );
    }

    pub fn assert_flow_at(&self, x: usize, y: usize, expected: u32) {
        let actual = self.transport().grid().get(x, y).flow;
        assert_eq!(actual, expected, "flow at ({x}, {y})");
    }
}

/// Tiles of an axis-aligned segment, inclusive at both ends.
fn line(x0: usize, y0: usize, x1: usize, y1: usize) -> Vec<TilePos> {
    if y0 == y1 {
        (x0.min(x1)..=x0.max(x1)).map(|x| TilePos(x, y0)).collect()
    } else {
        assert_eq!(x0, x1, "segments must be horizontal or vertical");
        (y0.min(y1)..=y0.max(y1)).map(|y| TilePos(x0, y)).collect()
    }
}
