//! Event bindings and the sinks that hand events to the host.
//!
//! The crate never performs an action itself. Each discrete event is looked up
//! in the active [`Bindings`] and passed on, together with its action
//! descriptor, to an [`EventSink`].

use anyhow::Result;
use std::{collections::HashMap, fmt, io::Write, str::FromStr};

use crate::config::ConfigError;
use crate::processor::Event;

pub const BINDING_KEYS: [&str; 5] = ["scroll.up", "scroll.down", "page.prev", "page.next", "capture"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Back,
    Forward,
}

/// What the host should do for a bound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Scroll by a signed number of pixels; negative is up.
    Scroll(i32),
    Navigate(Nav),
    /// Send a key chord like "CTRL+EQUAL".
    Key(String),
    Capture,
    None,
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("scroll:") {
            return rest.trim().parse().map(Action::Scroll).map_err(|_| ());
        }
        if let Some(rest) = s.strip_prefix("nav:") {
            return match rest.trim() {
                "back" => Ok(Action::Navigate(Nav::Back)),
                "forward" => Ok(Action::Navigate(Nav::Forward)),
                _ => Err(()),
            };
        }
        if let Some(rest) = s.strip_prefix("key:") {
            let chord = rest.trim();
            if chord.is_empty() || chord.split('+').any(|k| k.trim().is_empty()) {
                return Err(());
            }
            return Ok(Action::Key(chord.to_ascii_uppercase()));
        }
        match s {
            "capture" => Ok(Action::Capture),
            "none" => Ok(Action::None),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Scroll(px) => write!(f, "scroll:{px}"),
            Action::Navigate(Nav::Back) => f.write_str("nav:back"),
            Action::Navigate(Nav::Forward) => f.write_str("nav:forward"),
            Action::Key(chord) => write!(f, "key:{chord}"),
            Action::Capture => f.write_str("capture"),
            Action::None => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bindings {
    map: HashMap<&'static str, Action>,
}

impl Default for Bindings {
    fn default() -> Self {
        let map = HashMap::from([
            ("scroll.up", Action::Scroll(-400)),
            ("scroll.down", Action::Scroll(400)),
            ("page.prev", Action::Navigate(Nav::Back)),
            ("page.next", Action::Navigate(Nav::Forward)),
            ("capture", Action::Capture),
        ]);
        Self { map }
    }
}

impl Bindings {
    pub fn with_overrides(raw: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut out = Self::default();
        for (k, v) in raw {
            let key = BINDING_KEYS
                .iter()
                .copied()
                .find(|known| *known == k.as_str())
                .ok_or_else(|| ConfigError::UnknownBinding(k.clone()))?;
            let action = v.parse().map_err(|_| ConfigError::InvalidAction {
                key: k.clone(),
                action: v.clone(),
            })?;
            out.map.insert(key, action);
        }
        Ok(out)
    }

    pub fn get(&self, key: &str) -> Option<&Action> {
        self.map.get(key)
    }

    pub fn action_for(&self, event: &Event) -> Option<&Action> {
        event.binding_key().and_then(|k| self.get(k))
    }
}

/// Receives processed events in the order they were produced.
pub trait EventSink {
    fn emit(&mut self, timestamp_ms: u64, event: &Event, action: Option<&Action>) -> Result<()>;
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
    cursor: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W, cursor: bool) -> Self {
        Self { out, cursor }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, timestamp_ms: u64, event: &Event, action: Option<&Action>) -> Result<()> {
        if matches!(event, Event::CursorMoved { .. }) && !self.cursor {
            return Ok(());
        }
        // the event's own serde form carries the tag and any payload
        let mut line = serde_json::to_value(event)?;
        line["t"] = timestamp_ms.into();
        if event.binding_key().is_some() {
            line["action"] = action.map(|a| a.to_string()).into();
        }
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Looks up the binding for `event` and forwards it. Events bound to `none` are dropped.
pub fn dispatch_event(
    timestamp_ms: u64,
    event: &Event,
    bindings: &Bindings,
    sink: &mut dyn EventSink,
) -> Result<()> {
    let action = bindings.action_for(event);
    if action == Some(&Action::None) {
        return Ok(());
    }
    sink.emit(timestamp_ms, event, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_descriptors() {
        assert_eq!("scroll:-600".parse::<Action>(), Ok(Action::Scroll(-600)));
        assert_eq!("nav:back".parse::<Action>(), Ok(Action::Navigate(Nav::Back)));
        assert_eq!("key:ctrl+equal".parse::<Action>(), Ok(Action::Key("CTRL+EQUAL".into())));
        assert_eq!("capture".parse::<Action>(), Ok(Action::Capture));
        assert!("scroll:lots".parse::<Action>().is_err());
        assert!("key:CTRL+".parse::<Action>().is_err());
        assert!("cmd:rm -rf".parse::<Action>().is_err());
    }

    #[test]
    fn overrides_replace_defaults() {
        let raw = HashMap::from([("page.next".to_string(), "key:ALT+RIGHT".to_string())]);
        let b = Bindings::with_overrides(&raw).unwrap();
        assert_eq!(b.get("page.next"), Some(&Action::Key("ALT+RIGHT".into())));
        assert_eq!(b.get("scroll.up"), Some(&Action::Scroll(-400)));
    }

    #[test]
    fn invalid_action_names_the_binding() {
        let raw = HashMap::from([("capture".to_string(), "shoot".to_string())]);
        let err = Bindings::with_overrides(&raw).unwrap_err();
        assert_eq!(err.to_string(), "binding 'capture' has invalid action 'shoot'");
    }

    #[test]
    fn json_lines_output() {
        let b = Bindings::default();
        let mut sink = JsonLinesSink::new(Vec::new(), false);
        dispatch_event(100, &Event::ScrollUp, &b, &mut sink).unwrap();
        dispatch_event(120, &Event::CursorMoved { x: 1.0, y: 2.0 }, &b, &mut sink).unwrap();
        dispatch_event(140, &Event::TriggerCapture, &b, &mut sink).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "scroll_up");
        assert_eq!(lines[0]["action"], "scroll:-400");
        assert_eq!(lines[1]["event"], "trigger_capture");
        assert_eq!(lines[1]["t"], 140);
    }

    #[test]
    fn cursor_lines_carry_position_without_action() {
        let b = Bindings::default();
        let mut sink = JsonLinesSink::new(Vec::new(), true);
        dispatch_event(7, &Event::CursorMoved { x: 12.0, y: 34.5 }, &b, &mut sink).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(
            line,
            serde_json::json!({"t": 7, "event": "cursor_moved", "x": 12.0, "y": 34.5})
        );
    }

    #[test]
    fn none_binding_suppresses_event() {
        let raw = HashMap::from([("scroll.up".to_string(), "none".to_string())]);
        let b = Bindings::with_overrides(&raw).unwrap();
        let mut sink = JsonLinesSink::new(Vec::new(), true);
        dispatch_event(0, &Event::ScrollUp, &b, &mut sink).unwrap();
        assert!(sink.into_inner().is_empty());
    }
}
