//! Power-state providers consulted by the rail power phase.

/// Read-only view of the energy grid.
pub trait PowerProvider: Send + Sync {
    fn is_powered_at(&self, x: usize, y: usize) -> bool;
}

/// Fail-open default used when no energy subsystem is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysPowered;

impl PowerProvider for AlwaysPowered {
    fn is_powered_at(&self, _x: usize, _y: usize) -> bool {
        true
    }
}

/// Per-cell power flags, e.g. a copy of the energy grid's coverage.
/// Out-of-range cells are unpowered.
#[derive(Debug, Clone)]
pub struct PowerMask {
    powered: Vec<bool>,
    width: usize,
    height: usize,
}

impl PowerMask {
    pub fn new(width: usize, height: usize, powered: bool) -> Self {
        Self {
            powered: vec![powered; width * height],
            width,
            height,
        }
    }

    pub fn set(&mut self, x: usize, y: usize, powered: bool) {
        if x < self.width && y < self.height {
            self.powered[y * self.width + x] = powered;
        }
    }

    /// Set power for a rectangular area (inclusive), clipped to the mask.
    pub fn set_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, powered: bool) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let (x1, y1) = (x1.min(self.width - 1), y1.min(self.height - 1));
        for y in y0..=y1 {
            let row = y * self.width;
            for x in x0..=x1 {
                self.powered[row + x] = powered;
            }
        }
    }
}

impl PowerProvider for PowerMask {
    fn is_powered_at(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.powered[y * self.width + x]
    }
}
