//! Position counter threaded through one compilation.

use odsync_core::Position;

/// Running content-id of a flush.
///
/// Starts at zero; `advance` yields the next 1-based position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionCounter {
    current: u32,
}

impl PositionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to the next position and return it.
    pub fn advance(&mut self) -> Position {
        self.current += 1;
        Position::new(self.current)
    }

    /// Give back the current position when nothing was queued at it.
    pub fn retreat(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn current(&self) -> Position {
        Position::new(self.current)
    }

    pub fn value(&self) -> u32 {
        self.current
    }
}
