//! One-shot trigger for a sustained gesture.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldState {
    Idle,
    Holding { since_ms: u64 },
    /// Already triggered for this hold; stays here until [`HoldTimer::reset`].
    Fired { since_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct HoldTimer {
    threshold_ms: u64,
    state: HoldState,
}

impl HoldTimer {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold_ms,
            state: HoldState::Idle,
        }
    }

    /// Advance with a frame in which the gesture is still held.
    /// Returns true exactly once per continuous hold.
    pub fn update(&mut self, now_ms: u64) -> bool {
        match self.state {
            HoldState::Idle => {
                debug!("hold started at {now_ms}");
                self.state = HoldState::Holding { since_ms: now_ms };
                false
            }
            HoldState::Holding { since_ms } => {
                // negative elapsed (clock skew) never reaches the threshold
                let reached = now_ms
                    .checked_sub(since_ms)
                    .is_some_and(|held| held >= self.threshold_ms);
                reached && self.fire(since_ms)
            }
            HoldState::Fired { .. } => false,
        }
    }

    fn fire(&mut self, since_ms: u64) -> bool {
        self.state = HoldState::Fired { since_ms };
        true
    }

    pub fn reset(&mut self) {
        if self.state != HoldState::Idle {
            debug!("hold released");
        }
        self.state = HoldState::Idle;
    }

    pub fn state(&self) -> HoldState {
        self.state
    }

    pub fn started_at(&self) -> Option<u64> {
        match self.state {
            HoldState::Idle => None,
            HoldState::Holding { since_ms } | HoldState::Fired { since_ms } => Some(since_ms),
        }
    }

    pub fn has_fired(&self) -> bool {
        matches!(self.state, HoldState::Fired { .. })
    }
}
