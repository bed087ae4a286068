use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::congestion::ThresholdCrossing;
use crate::grid::TilePos;
use crate::rail::TerminalChange;

/// Notifications produced by one transport tick. They stay readable until the
/// next tick starts.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportEvent {
    /// Pathway or rail networks were relabelled.
    TopologyChanged {
        pathway_networks: u32,
        rail_networks: u32,
        /// Path-cache topology version after the rebuild.
        version: u64,
    },
    CongestionThresholdCrossed {
        pos: TilePos,
        congestion: u8,
        rising: bool,
    },
    TerminalActivated { pos: TilePos },
    TerminalDeactivated { pos: TilePos },
}

impl From<ThresholdCrossing> for TransportEvent {
    fn from(c: ThresholdCrossing) -> Self {
        TransportEvent::CongestionThresholdCrossed {
            pos: c.pos,
            congestion: c.congestion,
            rising: c.rising,
        }
    }
}

impl From<TerminalChange> for TransportEvent {
    fn from(c: TerminalChange) -> Self {
        if c.active {
            TransportEvent::TerminalActivated { pos: c.pos }
        } else {
            TransportEvent::TerminalDeactivated { pos: c.pos }
        }
    }
}
