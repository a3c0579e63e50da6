//! Idle-time accounting for the wake-up reward.

use std::time::Duration;

/// Wall-clock time accumulated while the companion is awake enough to wait
/// for the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleTimer {
    elapsed: Duration,
}

impl IdleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    /// Whole seconds counted so far.
    pub fn seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}
