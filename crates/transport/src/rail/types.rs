use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::NO_NETWORK;
use crate::grid::TilePos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode, Default)]
pub enum RailStructure {
    #[default]
    Empty,
    Track,
    Terminal,
}

/// One cell of the rail grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailTile {
    pub structure: RailStructure,
    pub network_id: u32,
    pub powered: bool,
    pub active: bool,
    /// Terminals only: at least one orthogonal neighbour is active track.
    pub adjacent_active_rail: bool,
}

impl RailTile {
    pub const EMPTY: RailTile = RailTile {
        structure: RailStructure::Empty,
        network_id: NO_NETWORK,
        powered: false,
        active: false,
        adjacent_active_rail: false,
    };

    #[inline]
    pub fn is_present(&self) -> bool {
        self.structure != RailStructure::Empty
    }

    #[inline]
    pub fn is_track(&self) -> bool {
        self.structure == RailStructure::Track
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.structure == RailStructure::Terminal
    }
}

impl Default for RailTile {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A terminal whose active state flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct TerminalChange {
    pub pos: TilePos,
    pub active: bool,
}

/// Summary of one rail tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RailTickReport {
    pub topology_rebuilt: bool,
    pub powered_tiles: u32,
    pub active_tracks: u32,
    pub active_terminals: u32,
    pub terminal_changes: Vec<TerminalChange>,
}
