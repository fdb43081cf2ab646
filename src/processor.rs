//! Per-session frame processing.
//!
//! A [`FrameProcessor`] owns every piece of mutable session state (axis
//! histories, cooldown, hold timer, cursor smoothing) and is driven by one
//! call per camera frame. Frames are processed to completion in order; the
//! processor is not shared between threads.

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{ConfigError, Settings};
use crate::cursor::CursorSmoother;
use crate::debounce::{AxisDebouncer, Cooldown, Direction};
use crate::fingers::FingerState;
use crate::gestures::Gesture;
use crate::hold::{HoldState, HoldTimer};
use crate::landmarks::{HandLandmarks, Landmark};

/// Output of the processor, in production order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ScrollUp,
    ScrollDown,
    PrevPage,
    NextPage,
    TriggerCapture,
    /// Smoothed pointer position in screen pixels.
    CursorMoved { x: f32, y: f32 },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ScrollUp => "scroll_up",
            Event::ScrollDown => "scroll_down",
            Event::PrevPage => "prev_page",
            Event::NextPage => "next_page",
            Event::TriggerCapture => "trigger_capture",
            Event::CursorMoved { .. } => "cursor_moved",
        }
    }

    /// Key under which the event is bound to an action; cursor motion is unbound.
    pub fn binding_key(&self) -> Option<&'static str> {
        match self {
            Event::ScrollUp => Some("scroll.up"),
            Event::ScrollDown => Some("scroll.down"),
            Event::PrevPage => Some("page.prev"),
            Event::NextPage => Some("page.next"),
            Event::TriggerCapture => Some("capture"),
            Event::CursorMoved { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

pub struct FrameProcessor {
    settings: Settings,
    running: bool,
    /// Category of the previous frame; `None` when no hand was seen.
    active: Option<Gesture>,
    vertical: AxisDebouncer,
    horizontal: AxisDebouncer,
    cooldown: Cooldown,
    hold: HoldTimer,
    cursor: CursorSmoother,
}

impl FrameProcessor {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let th = &settings.thresholds;
        let c = &settings.cursor;
        Ok(Self {
            running: true,
            active: None,
            vertical: AxisDebouncer::new(th.history_len, th.scroll_threshold),
            horizontal: AxisDebouncer::new(th.history_len, th.swipe_threshold),
            cooldown: Cooldown::new(th.cooldown_ms),
            hold: HoldTimer::new(th.hold_ms),
            cursor: CursorSmoother::new(
                c.smoothing_len,
                c.screen_width,
                c.screen_height,
                c.sensitivity,
            ),
            settings,
        })
    }

    /// Swap in new settings. The session starts over; the cooldown is kept
    /// so a reload cannot produce a second event inside one window.
    pub fn reconfigure(&mut self, settings: Settings) -> Result<(), ConfigError> {
        let mut next = Self::new(settings)?;
        next.cooldown.carry_over(&self.cooldown);
        next.running = self.running;
        *self = next;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Process one frame. `hand` is `None` when the detector saw no hand.
    /// Malformed landmark sets are handled like a missing hand.
    pub fn process_frame(&mut self, now_ms: u64, hand: Option<&[Landmark]>) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }

        let hand = match hand.map(HandLandmarks::from_points) {
            Some(Ok(h)) => h,
            Some(Err(e)) => {
                warn!("dropping malformed frame at {now_ms}: {e}");
                self.lose_hand();
                return events;
            }
            None => {
                self.lose_hand();
                return events;
            }
        };

        let th = &self.settings.thresholds;
        let fingers = FingerState::classify(&hand, th.raise_margin, th.fist_distance);
        let gesture = Gesture::classify(&fingers);
        self.transition(gesture);

        match gesture {
            Gesture::ScrollUp => {
                let y = hand.index_tip().y;
                events.extend(self.vertical_step(y, now_ms, gesture));
                let (x, y) = self.cursor.push(hand.index_tip());
                events.push(Event::CursorMoved { x, y });
            }
            Gesture::ScrollDown => {
                let y = (hand.index_tip().y + hand.middle_tip().y) / 2.0;
                events.extend(self.vertical_step(y, now_ms, gesture));
            }
            Gesture::Swipe => {
                let x = 1.0 - hand.index_tip().x;
                let fired = self
                    .horizontal
                    .update(x, now_ms, &mut self.cooldown, |_| true);
                events.extend(fired.map(|dir| match dir {
                    Direction::Positive => Event::PrevPage,
                    Direction::Negative => Event::NextPage,
                }));
            }
            Gesture::Fist => {
                if self.hold.update(now_ms) {
                    events.push(Event::TriggerCapture);
                }
            }
            Gesture::None => self.reset_session(),
        }

        for ev in &events {
            if !matches!(ev, Event::CursorMoved { .. }) {
                info!("{} at {now_ms}", ev.name());
            }
        }
        events
    }

    fn vertical_step(&mut self, y: f32, now_ms: u64, gesture: Gesture) -> Option<Event> {
        let lock = self.settings.thresholds.lock_scroll_direction;
        let fired = self.vertical.update(y, now_ms, &mut self.cooldown, |dir| {
            !lock
                || match gesture {
                    Gesture::ScrollUp => dir == Direction::Negative,
                    Gesture::ScrollDown => dir == Direction::Positive,
                    _ => false,
                }
        });
        // image Y grows downward: a rising hand scrolls up
        fired.map(|dir| match dir {
            Direction::Negative => Event::ScrollUp,
            Direction::Positive => Event::ScrollDown,
        })
    }

    /// Clears state belonging to the previous gesture when the category changes.
    fn transition(&mut self, gesture: Gesture) {
        if self.active == Some(gesture) {
            return;
        }
        debug!(
            "gesture {} -> {}",
            self.active.map_or("no-hand", |g| g.as_str()),
            gesture.as_str()
        );
        self.vertical.reset();
        self.horizontal.reset();
        if gesture != Gesture::Fist {
            self.hold.reset();
        }
        self.active = Some(gesture);
    }

    fn lose_hand(&mut self) {
        if self.active.is_some() {
            debug!("hand lost");
        }
        self.active = None;
        self.reset_session();
    }

    fn reset_session(&mut self) {
        self.vertical.reset();
        self.horizontal.reset();
        self.hold.reset();
    }

    /// Stop accepting frames. The session is reset; later frames are ignored
    /// until [`FrameProcessor::start`].
    pub fn stop(&mut self) {
        if self.running {
            info!("frame processing stopped");
        }
        self.running = false;
        self.active = None;
        self.reset_session();
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn active_gesture(&self) -> Option<Gesture> {
        self.active
    }

    pub fn history_len(&self, axis: Axis) -> usize {
        match axis {
            Axis::Vertical => self.vertical.history().len(),
            Axis::Horizontal => self.horizontal.history().len(),
        }
    }

    pub fn hold_state(&self) -> HoldState {
        self.hold.state()
    }

    pub fn last_action_at(&self) -> Option<u64> {
        self.cooldown.last_action_at()
    }
}
