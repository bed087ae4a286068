use crate::grid::TilePos;
use crate::rail::PowerMask;
use crate::test_harness::TestColony;
use crate::transport_system::{TransportEvent, TransportProvider};

// ====================================================================
// Rail and terminals through the plugin
// ====================================================================

#[test]
fn test_terminal_activates_without_energy_subsystem() {
    let mut colony = TestColony::with_size(32, 32)
        .with_rail(2, 10, 12, 10)
        .with_terminal(7, 11);
    colony.tick(1);
    assert!(colony.transport().is_terminal_active_at(7, 11));
    assert!(colony
        .events()
        .contains(&TransportEvent::TerminalActivated { pos: TilePos(7, 11) }));
}

#[test]
fn test_terminal_coverage_reaches_nearby_cells() {
    let mut colony = TestColony::with_size(32, 32)
        .with_rail(2, 10, 12, 10)
        .with_terminal(7, 11);
    colony.tick(1);
    let t = colony.transport();
    let radius = t.params().terminal_service_radius as usize;
    assert!(t.is_covered_by_terminal(7, 11 + radius));
    assert!(!t.is_covered_by_terminal(7, 12 + radius));
    assert_eq!(t.covering_terminals(8, 12), vec![TilePos(7, 11)]);
}

#[test]
fn test_unpowered_district_keeps_terminal_dark() {
    let mut mask = PowerMask::new(32, 32, true);
    mask.set_rect(0, 0, 31, 9, false);
    let mut colony = TestColony::with_size(32, 32)
        .with_rail(2, 10, 12, 10)
        .with_rail(5, 5, 5, 9)
        .with_terminal(6, 5)
        .with_terminal(7, 11)
        .with_power(mask);
    colony.tick(1);
    let t = colony.transport();
    assert!(!t.is_terminal_active_at(6, 5));
    assert!(!t.is_rail_active_at(5, 5));
    assert!(t.is_terminal_active_at(7, 11));
    assert!(t.is_rail_active_at(7, 10));
    assert_eq!(t.stats().active_terminals, 1);
}

#[test]
fn test_power_loss_and_restore_emit_events() {
    let mut colony = TestColony::with_size(32, 32)
        .with_rail(0, 0, 3, 0)
        .with_terminal(1, 1);
    colony.tick(1);
    colony
        .transport_mut()
        .set_power_provider(Box::new(PowerMask::new(32, 32, false)));
    colony.tick(1);
    assert!(!colony.transport().is_terminal_active_at(1, 1));
    colony.transport_mut().clear_power_provider();
    colony.tick(1);
    assert!(colony.transport().is_terminal_active_at(1, 1));

    let terminal_events: Vec<TransportEvent> = colony
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                TransportEvent::TerminalActivated { .. } | TransportEvent::TerminalDeactivated { .. }
            )
        })
        .collect();
    assert_eq!(
        terminal_events,
        vec![
            TransportEvent::TerminalActivated { pos: TilePos(1, 1) },
            TransportEvent::TerminalDeactivated { pos: TilePos(1, 1) },
            TransportEvent::TerminalActivated { pos: TilePos(1, 1) },
        ]
    );
}

#[test]
fn test_demolishing_track_strands_terminal() {
    let mut colony = TestColony::with_size(32, 32)
        .with_rail(4, 4, 4, 4)
        .with_terminal(5, 4);
    colony.tick(1);
    assert!(colony.transport().is_terminal_active_at(5, 4));
    colony.transport_mut().remove_rail(4, 4).unwrap();
    assert!(!colony.transport().is_terminal_active_at(5, 4));
    colony.tick(5);
    assert!(!colony.transport().is_terminal_active_at(5, 4));
}

#[test]
fn test_rail_crossing_keeps_pathway_network_intact() {
    let mut colony = TestColony::with_size(32, 32)
        .with_pathway(0, 5, 10, 5)
        .with_rail(5, 0, 5, 10);
    colony.tick(1);
    colony.assert_connected((0, 5), (10, 5));
    let t = colony.transport();
    assert_eq!(t.network_graph().component_count(), 1);
    assert_eq!(t.rail().component_count(), 1);
}
