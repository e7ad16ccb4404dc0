/// Step clock - advances one step whenever a full step interval has elapsed
use crate::grid::Column;

#[derive(Debug, Clone)]
pub struct StepClock {
    frame: Column,
    last_advance_ms: u64,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            frame: Column::C0,
            last_advance_ms: 0,
        }
    }

    pub fn frame(&self) -> Column {
        self.frame
    }

    pub fn last_advance_ms(&self) -> u64 {
        self.last_advance_ms
    }

    /// Advance by one step if `interval_ms` has passed since the last
    /// advance. Returns the new step. Never advances more than once per call,
    /// so a late tick delays the pattern instead of skipping a step.
    pub fn poll(&mut self, now_ms: u64, interval_ms: u64) -> Option<Column> {
        if now_ms.saturating_sub(self.last_advance_ms) < interval_ms {
            return None;
        }
        self.frame = self.frame.next();
        self.last_advance_ms = now_ms;
        Some(self.frame)
    }
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new()
    }
}
