pub const GRID_WIDTH: usize = 256;
pub const GRID_HEIGHT: usize = 256;

/// Health of a freshly placed pathway tile.
pub const MAX_HEALTH: u8 = 255;

/// Distance value for tiles the proximity field has not reached.
pub const PROXIMITY_UNREACHED: u8 = 255;

/// Network id of tiles that belong to no component.
pub const NO_NETWORK: u32 = 0;
