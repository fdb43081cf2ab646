//! Camera hand-gesture recognition: turns per-frame hand landmarks into
//! scroll, page navigation, capture and cursor events.

pub mod actions;
pub mod config;
pub mod cursor;
pub mod debounce;
pub mod fingers;
pub mod gestures;
pub mod history;
pub mod hold;
pub mod landmarks;
pub mod processor;

pub use config::{ConfigError, Settings};
pub use gestures::Gesture;
pub use landmarks::{FrameRecord, Landmark};
pub use processor::{Event, FrameProcessor};
