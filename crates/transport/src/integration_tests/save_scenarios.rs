use crate::grid::{PathwayKind, TilePos};
use crate::test_harness::TestColony;
use crate::transport_params::TransportParams;
use crate::transport_system::{TransportProvider, TransportSystem};
use crate::Saveable;

// ====================================================================
// Save / load through the ECS
// ====================================================================

fn built_colony() -> TestColony {
    let mut colony = TestColony::with_size(48, 48)
        .with_pathway_kind(2, 2, 20, 2, PathwayKind::Avenue)
        .with_pathway(20, 3, 20, 12)
        .with_rail(30, 30, 40, 30)
        .with_terminal(35, 31)
        .with_demand(10, 4, 120);
    colony.transport_mut().damage_pathway(20, 8, 90);
    colony.tick(5);
    colony
}

#[test]
fn test_round_trip_through_world() {
    let mut colony = built_colony();
    let bytes = colony
        .transport()
        .save_to_bytes()
        .expect("non-empty network saves");

    let mut fresh = TestColony::new().with_demand(10, 4, 120);
    fresh
        .world_mut()
        .insert_resource(TransportSystem::load_from_bytes(&bytes));
    fresh.tick(1);
    colony.tick(1);

    let (a, b) = (colony.transport(), fresh.transport());
    assert_eq!(b.width(), 48);
    assert_eq!(b.grid().pathway_count(), a.grid().pathway_count());
    assert_eq!(b.health_at(20, 8), 255 - 90);
    assert_eq!(b.grid().get(5, 2).kind, PathwayKind::Avenue);
    assert!(b.is_connected(TilePos(2, 2), TilePos(20, 12)));
    assert!(b.is_terminal_active_at(35, 31));
    assert_eq!(b.stats().total_flow, a.stats().total_flow);
    assert_eq!(b.flow_at(10, 2), a.flow_at(10, 2));
}

#[test]
fn test_custom_params_survive_round_trip() {
    let params = TransportParams {
        spread_rate: 0.25,
        terminal_service_radius: 3,
        ..TransportParams::default()
    };
    let mut system = TransportSystem::with_params(16, 16, params);
    system.place_pathway(1, 1).unwrap();
    let restored = TransportSystem::load_from_bytes(&system.save_to_bytes().unwrap());
    assert_eq!(restored.params().spread_rate, 0.25);
    assert_eq!(restored.params().terminal_service_radius, 3);
}

#[test]
fn test_params_from_json_drive_the_simulation() {
    let params = TransportParams::from_json(r#"{ "spread_rate": 0.0 }"#).unwrap();
    let mut colony = TestColony::with_size(16, 16)
        .with_pathway(0, 0, 4, 0)
        .with_demand(2, 0, 90);
    colony.transport_mut().set_params(params);
    colony.tick(1);
    colony.assert_flow_at(2, 0, 90);
    colony.assert_flow_at(1, 0, 0);
}
