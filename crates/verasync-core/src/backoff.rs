// ── Poll failure backoff ──

use std::time::Duration;

/// Consecutive-failure counter for the poll loop.
///
/// The multiplier goes 1, 2, 4, 8, ... up to `ceiling` and the sleep
/// before the next attempt is `base * multiplier`. One fully successful
/// iteration resets it.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    ceiling: u32,
    count: u32,
}

impl Backoff {
    pub fn new(base: Duration, ceiling: u32) -> Self {
        Self {
            base,
            ceiling: ceiling.max(1),
            count: 0,
        }
    }

    /// Record a failure and return how long to sleep before retrying.
    pub fn fail(&mut self) -> Duration {
        self.count = match self.count {
            0 => 1,
            n => n.saturating_mul(2).min(self.ceiling),
        };
        self.base * self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Current multiplier (0 after a success).
    pub fn count(&self) -> u32 {
        self.count
    }
}
