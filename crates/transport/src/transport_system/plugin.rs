use bevy::prelude::*;

use crate::flow_distribution::DemandSource;
use crate::simulation_sets::SimulationSet;

use super::events::TransportEvent;
use super::system::TransportSystem;

/// Building demand for the coming tick. Zone and building systems refresh it
/// in `SimulationSet::PreSim`; transport only reads it.
#[derive(Resource, Debug, Clone, Default)]
pub struct DemandSources {
    pub sources: Vec<DemandSource>,
}

/// Run one transport tick and forward its events.
pub fn tick_transport(
    mut transport: ResMut<TransportSystem>,
    demand: Res<DemandSources>,
    mut events: EventWriter<TransportEvent>,
) {
    if demand.is_changed() {
        transport.set_demand_sources(demand.sources.clone());
    }
    let emitted = transport.tick();
    events.send_batch(emitted.iter().copied());
}

pub struct TransportPlugin;

impl Plugin for TransportPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TransportSystem>()
            .init_resource::<DemandSources>()
            .add_event::<TransportEvent>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::PreSim,
                    SimulationSet::Simulation,
                    SimulationSet::PostSim,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                tick_transport.in_set(SimulationSet::Simulation),
            );
    }
}
