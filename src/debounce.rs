//! Turns continuous per-axis motion into discrete directional firings.
//!
//! Each axis keeps a short [`HistoryBuffer`]. The first sample after the
//! buffer is emptied is only a baseline. Later samples are compared with the
//! previous one; when the step exceeds the axis threshold and the shared
//! [`Cooldown`] has elapsed, the axis fires once and drops its history so the
//! next gesture needs a fresh baseline.

use log::debug;

use crate::history::HistoryBuffer;

/// Sign of a firing movement along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Negative,
    Positive,
}

/// Session-wide cooldown shared by every axis.
#[derive(Debug, Clone)]
pub struct Cooldown {
    window_ms: u64,
    last_action_at: Option<u64>,
}

impl Cooldown {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_action_at: None,
        }
    }

    /// True when nothing fired yet or strictly more than the window has passed.
    /// A clock that went backwards reads as "not elapsed".
    pub fn elapsed(&self, now_ms: u64) -> bool {
        match self.last_action_at {
            None => true,
            Some(t) => now_ms
                .checked_sub(t)
                .is_some_and(|dt| dt > self.window_ms),
        }
    }

    pub fn mark(&mut self, now_ms: u64) {
        self.last_action_at = Some(now_ms);
    }

    pub fn last_action_at(&self) -> Option<u64> {
        self.last_action_at
    }

    /// Keep the last firing time of a cooldown this one replaces.
    pub fn carry_over(&mut self, previous: &Cooldown) {
        self.last_action_at = previous.last_action_at;
    }
}

/// Whether an axis is still collecting its first sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisState {
    WaitingForBaseline,
    Armed,
}

#[derive(Debug, Clone)]
pub struct AxisDebouncer {
    history: HistoryBuffer,
    threshold: f32,
}

impl AxisDebouncer {
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            history: HistoryBuffer::new(capacity),
            threshold,
        }
    }

    pub fn state(&self) -> AxisState {
        if self.history.is_empty() {
            AxisState::WaitingForBaseline
        } else {
            AxisState::Armed
        }
    }

    /// Feed one sample. `allow` filters which direction may fire; a movement
    /// in a disallowed direction is recorded like any sub-threshold sample.
    pub fn update(
        &mut self,
        value: f32,
        now_ms: u64,
        cooldown: &mut Cooldown,
        allow: impl Fn(Direction) -> bool,
    ) -> Option<Direction> {
        let Some(prev) = self.history.last() else {
            self.history.push(value);
            return None;
        };

        let delta = value - prev;
        if delta.abs() > self.threshold {
            let dir = if delta < 0.0 {
                Direction::Negative
            } else {
                Direction::Positive
            };
            if !allow(dir) {
                debug!("movement {delta:+.3} ignored for this gesture");
            } else if cooldown.elapsed(now_ms) {
                cooldown.mark(now_ms);
                self.history.clear();
                return Some(dir);
            } else {
                debug!("movement {delta:+.3} suppressed by cooldown");
            }
        }

        self.history.push(value);
        None
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }
}
