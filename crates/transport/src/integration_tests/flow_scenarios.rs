use crate::flow_distribution::DemandSource;
use crate::grid::{PathwayKind, TilePos};
use crate::test_harness::TestColony;
use crate::transport_params::TransportParams;
use crate::transport_system::{TransportEvent, TransportProvider};

// ====================================================================
// Flow and congestion through the plugin
// ====================================================================

#[test]
fn test_demand_resource_feeds_the_network() {
    let mut colony = TestColony::with_size(32, 32)
        .with_pathway(0, 0, 4, 0)
        .with_demand(0, 0, 100);
    colony.tick(1);
    colony.assert_flow_at(0, 0, 50);
    colony.assert_flow_at(1, 0, 50);
    colony.assert_flow_at(2, 0, 0);
}

#[test]
fn test_demand_changes_are_picked_up() {
    let mut colony = TestColony::with_size(32, 32)
        .with_pathway(0, 0, 4, 0)
        .with_demand(2, 0, 40);
    colony.tick(1);
    assert_eq!(colony.transport().stats().total_flow, 40);

    colony
        .demand_mut()
        .sources
        .push(DemandSource::new(4, 1, 60));
    colony.tick(1);
    assert_eq!(colony.transport().stats().total_flow, 100);

    colony.demand_mut().sources.clear();
    colony.tick(1);
    assert_eq!(colony.transport().stats().total_flow, 0);
}

#[test]
fn test_building_beside_road_loads_the_road() {
    let mut colony = TestColony::with_size(64, 64)
        .with_pathway(10, 20, 30, 20)
        .with_demand(15, 23, 30)
        .with_demand(25, 17, 30);
    colony.tick(1);
    let t = colony.transport();
    assert_eq!(t.stats().total_flow, 60);
    assert!(t.flow_at(15, 20) > 0);
    assert!(t.flow_at(25, 20) > 0);
}

#[test]
fn test_heavy_demand_congests_and_raises_event() {
    let mut colony = TestColony::with_size(32, 32)
        .with_pathway_kind(0, 0, 0, 0, PathwayKind::Trail)
        .with_demand(0, 0, 500);
    colony.tick(1);
    assert_eq!(colony.transport().congestion_at(0, 0), 255);
    let crossing = colony
        .events()
        .into_iter()
        .find(|e| matches!(e, TransportEvent::CongestionThresholdCrossed { .. }));
    assert_eq!(
        crossing,
        Some(TransportEvent::CongestionThresholdCrossed {
            pos: TilePos(0, 0),
            congestion: 255,
            rising: true,
        })
    );
}

#[test]
fn test_avenue_carries_more_than_trail() {
    let mut colony = TestColony::with_size(32, 32)
        .with_pathway_kind(0, 0, 0, 0, PathwayKind::Trail)
        .with_pathway_kind(0, 5, 0, 5, PathwayKind::Avenue)
        .with_demand(0, 0, 15)
        .with_demand(0, 5, 15);
    colony.tick(1);
    let t = colony.transport();
    assert!(t.congestion_at(0, 0) > t.congestion_at(0, 5));
}

#[test]
fn test_sustained_congestion_wears_down_road() {
    let mut colony = TestColony::with_size(32, 32)
        .with_pathway(3, 3, 3, 3)
        .with_demand(3, 3, 1000);
    colony.tick(99);
    assert_eq!(colony.transport().health_at(3, 3), 255);
    colony.tick(1);
    let params = TransportParams::default();
    assert_eq!(
        colony.transport().health_at(3, 3),
        255 - params.decay_amount
    );
    assert!(colony.transport().capacity_at(3, 3) < 40);
}

#[test]
fn test_detour_avoids_congested_segment() {
    // Two parallel routes from (0,0) to (6,0): the direct row and a loop
    // through row 2. Loading the direct row pushes the search onto the loop.
    let mut colony = TestColony::with_size(32, 32)
        .with_pathway(0, 0, 6, 0)
        .with_pathway(0, 1, 0, 2)
        .with_pathway(0, 2, 6, 2)
        .with_pathway(6, 1, 6, 2);
    colony.tick(1);
    let direct = colony
        .transport_mut()
        .find_path(TilePos(0, 0), TilePos(6, 0))
        .unwrap();
    assert_eq!(direct.len(), 7);

    colony.demand_mut().sources = (1..6).map(|x| DemandSource::new(x, 0, 400)).collect();
    // Age the cached route out.
    colony.tick(60);
    let detour = colony
        .transport_mut()
        .find_path(TilePos(0, 0), TilePos(6, 0))
        .unwrap();
    assert!(detour.tiles.contains(&TilePos(3, 2)));
    colony.assert_connected((0, 0), (6, 2));
}
