use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
    },
    thread,
    time::{Duration, Instant},
};

use handctl::FrameRecord;
use handctl::FrameProcessor;
use handctl::actions::{Bindings, EventSink, JsonLinesSink, dispatch_event};
use handctl::config::ProfileStore;

const POLL: Duration = Duration::from_millis(50);

pub struct RunOptions {
    pub input: Option<PathBuf>,
    pub cursor: bool,
    pub watch: bool,
}

enum InputMsg {
    Line(String),
    Eof,
    Failed(String),
}

/// Picks one time base per stream, latched on the first frame: detector
/// timestamps if that frame carries `t`, the local monotonic clock otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum StreamClock {
    #[default]
    Unlatched,
    /// Frames missing `t` advance from the last detector stamp by local elapsed time.
    Detector { last_t: u64, seen_at: u64 },
    Local,
}

impl StreamClock {
    fn stamp(&mut self, t: Option<u64>, local_ms: u64) -> u64 {
        match (*self, t) {
            (StreamClock::Unlatched, Some(t)) => {
                debug!("stream clock: detector timestamps");
                *self = StreamClock::Detector { last_t: t, seen_at: local_ms };
                t
            }
            (StreamClock::Unlatched, None) => {
                debug!("stream clock: local");
                *self = StreamClock::Local;
                local_ms
            }
            (StreamClock::Detector { .. }, Some(t)) => {
                *self = StreamClock::Detector { last_t: t, seen_at: local_ms };
                t
            }
            (StreamClock::Detector { last_t, seen_at }, None) => {
                let t = last_t.saturating_add(local_ms.saturating_sub(seen_at));
                *self = StreamClock::Detector { last_t: t, seen_at: local_ms };
                t
            }
            (StreamClock::Local, _) => local_ms,
        }
    }
}

#[derive(Debug, Default)]
struct Stats {
    frames: u64,
    malformed_lines: u64,
    events: u64,
}

/// Streams frames through one processor until EOF or SIGINT/SIGTERM.
pub fn run_pipeline(mut store: ProfileStore, opts: RunOptions) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&stop))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&stop))?;

    let mut processor = FrameProcessor::new(store.profile.settings())?;
    let mut bindings = store.profile.bindings()?;
    info!("streaming with profile '{}'", store.active_name);

    let rx_in = spawn_reader(opts.input.clone())?;

    // keep the watcher alive for the whole run
    let (_watcher, rx_fs) = if opts.watch {
        let (w, rx) = watch_profiles(&store)?;
        (Some(w), Some(rx))
    } else {
        (None, None)
    };

    let clock = Instant::now();
    let stdout = io::stdout();
    let mut sink = JsonLinesSink::new(stdout.lock(), opts.cursor);
    let mut stats = Stats::default();
    let mut stream_clock = StreamClock::default();

    loop {
        if stop.load(Ordering::Relaxed) {
            processor.stop();
            break;
        }

        if let Some(rx) = &rx_fs {
            if profile_changed(rx, &store) {
                apply_reload(&mut store, &mut processor, &mut bindings);
            }
        }

        match rx_in.recv_timeout(POLL) {
            Ok(InputMsg::Line(line)) => {
                let local_ms = clock.elapsed().as_millis() as u64;
                handle_line(
                    &line,
                    local_ms,
                    &mut stream_clock,
                    &mut processor,
                    &bindings,
                    &mut sink,
                    &mut stats,
                )?;
            }
            Ok(InputMsg::Eof) => break,
            Ok(InputMsg::Failed(e)) => {
                error!("input failed: {e}");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(
        "processed {} frames ({} malformed lines), emitted {} events",
        stats.frames, stats.malformed_lines, stats.events
    );
    Ok(())
}

fn handle_line(
    line: &str,
    local_ms: u64,
    stream_clock: &mut StreamClock,
    processor: &mut FrameProcessor,
    bindings: &Bindings,
    sink: &mut dyn EventSink,
    stats: &mut Stats,
) -> Result<()> {
    if line.trim().is_empty() {
        return Ok(());
    }
    let record = match serde_json::from_str::<FrameRecord>(line) {
        Ok(r) => r,
        Err(e) => {
            warn!("unreadable frame line, treating as no hand: {e}");
            stats.malformed_lines += 1;
            FrameRecord::default()
        }
    };
    let t = stream_clock.stamp(record.timestamp_ms, local_ms);

    stats.frames += 1;
    for ev in processor.process_frame(t, record.hand()) {
        stats.events += 1;
        dispatch_event(t, &ev, bindings, sink)?;
    }
    Ok(())
}

fn spawn_reader(input: Option<PathBuf>) -> Result<Receiver<InputMsg>> {
    let reader: Box<dyn BufRead + Send> = match &input {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(f))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in reader.lines() {
            let msg = match line {
                Ok(l) => InputMsg::Line(l),
                Err(e) => InputMsg::Failed(e.to_string()),
            };
            let failed = matches!(msg, InputMsg::Failed(_));
            if tx.send(msg).is_err() || failed {
                return;
            }
        }
        let _ = tx.send(InputMsg::Eof);
    });
    Ok(rx)
}

type FsEvents = Receiver<notify::Result<notify::Event>>;

fn watch_profiles(store: &ProfileStore) -> Result<(RecommendedWatcher, FsEvents)> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    // editors often replace the file, so watch the directory
    watcher.watch(&store.profiles_dir, RecursiveMode::NonRecursive)?;
    debug!("watching {}", store.profiles_dir.display());
    Ok((watcher, rx))
}

/// Drains pending notifications; true if any touched the active profile.
fn profile_changed(rx: &FsEvents, store: &ProfileStore) -> bool {
    let active = store.active_path();
    let mut changed = false;
    while let Ok(res) = rx.try_recv() {
        match res {
            Ok(ev) => {
                if (ev.kind.is_modify() || ev.kind.is_create())
                    && ev.paths.iter().any(|p| p.file_name() == active.file_name())
                {
                    changed = true;
                }
            }
            Err(e) => warn!("profile watch error: {e}"),
        }
    }
    changed
}

fn apply_reload(store: &mut ProfileStore, processor: &mut FrameProcessor, bindings: &mut Bindings) {
    if let Err(e) = store.reload() {
        warn!("reload rejected, keeping last good profile: {e:#}");
        return;
    }
    let next_bindings = match store.profile.bindings() {
        Ok(b) => b,
        Err(e) => {
            warn!("reload rejected: {e}");
            return;
        }
    };
    match processor.reconfigure(store.profile.settings()) {
        Ok(()) => {
            *bindings = next_bindings;
            info!("profile '{}' reloaded", store.active_name);
        }
        Err(e) => warn!("reload rejected: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handctl::Settings;
    use handctl::landmarks::{
        INDEX_MCP, INDEX_TIP, MIDDLE_MCP, MIDDLE_TIP, PINKY_MCP, PINKY_TIP, RING_MCP, RING_TIP,
    };
    use handctl::processor::Axis;
    use serde_json::{Value, json};

    /// Frame line with only the index finger raised, its tip at `index_y`.
    fn one_finger_line(t: Option<u64>, index_y: f32) -> String {
        let mut pts = vec![json!({"x": 0.5, "y": 0.95}); 21];
        for (i, mcp) in [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP].into_iter().enumerate() {
            pts[mcp] = json!({"x": 0.3 + 0.1 * i as f32, "y": 0.8});
        }
        for (i, tip) in [MIDDLE_TIP, RING_TIP, PINKY_TIP].into_iter().enumerate() {
            pts[tip] = json!({"x": 0.4 + 0.1 * i as f32, "y": 0.85});
        }
        pts[INDEX_TIP] = json!({"x": 0.3, "y": index_y});
        match t {
            Some(t) => json!({"t": t, "landmarks": pts}).to_string(),
            None => json!({"landmarks": pts}).to_string(),
        }
    }

    struct Harness {
        clock: StreamClock,
        processor: FrameProcessor,
        bindings: Bindings,
        sink: JsonLinesSink<Vec<u8>>,
        stats: Stats,
    }

    impl Harness {
        fn new(cursor: bool) -> Self {
            Self {
                clock: StreamClock::default(),
                processor: FrameProcessor::new(Settings::default()).unwrap(),
                bindings: Bindings::default(),
                sink: JsonLinesSink::new(Vec::new(), cursor),
                stats: Stats::default(),
            }
        }

        fn feed(&mut self, line: &str, local_ms: u64) {
            handle_line(
                line,
                local_ms,
                &mut self.clock,
                &mut self.processor,
                &self.bindings,
                &mut self.sink,
                &mut self.stats,
            )
            .unwrap();
        }

        fn output(self) -> Vec<Value> {
            let text = String::from_utf8(self.sink.into_inner()).unwrap();
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
        }
    }

    #[test]
    fn garbage_line_resets_like_hand_loss() {
        let mut h = Harness::new(false);
        h.feed(&one_finger_line(Some(0), 0.40), 0);
        assert_eq!(h.processor.history_len(Axis::Vertical), 1);

        h.feed("{not json", 10);
        assert_eq!(h.stats.malformed_lines, 1);
        assert_eq!(h.processor.history_len(Axis::Vertical), 0);

        // would be a scroll against the first baseline; after the reset it is the new baseline
        h.feed(&one_finger_line(Some(40), 0.30), 40);
        assert_eq!(h.processor.history_len(Axis::Vertical), 1);
        assert_eq!(h.stats.frames, 3);
        // cursor samples only, and the sink drops those
        assert_eq!(h.stats.events, 2);
        assert!(h.output().is_empty());
    }

    #[test]
    fn blank_lines_are_not_frames() {
        let mut h = Harness::new(true);
        h.feed("   ", 0);
        assert_eq!(h.stats.frames, 0);
        assert_eq!(h.clock, StreamClock::Unlatched);
    }

    #[test]
    fn untimed_stream_uses_local_clock_throughout() {
        let mut h = Harness::new(true);
        h.feed(&one_finger_line(None, 0.40), 250);
        // a stray detector stamp must not jump the session clock
        h.feed(&one_finger_line(Some(100_000), 0.40), 300);
        let out = h.output();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["event"], "cursor_moved");
        assert_eq!(out[0]["t"], 250);
        assert_eq!(out[1]["t"], 300);
    }

    #[test]
    fn timed_stream_fills_gaps_from_the_last_stamp() {
        let mut h = Harness::new(false);
        h.feed(&one_finger_line(Some(100_000), 0.40), 10);
        h.feed(&one_finger_line(None, 0.30), 60);
        assert_eq!(h.processor.last_action_at(), Some(100_050));
        let out = h.output();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["event"], "scroll_up");
        assert_eq!(out[0]["action"], "scroll:-400");
        assert_eq!(out[0]["t"], 100_050);
    }

    #[test]
    fn stream_clock_latches_once() {
        let mut c = StreamClock::default();
        assert_eq!(c.stamp(Some(5_000), 0), 5_000);
        assert_eq!(c.stamp(None, 30), 5_030);
        assert_eq!(c.stamp(Some(5_100), 40), 5_100);
        // local clock running backwards does not rewind the stream
        assert_eq!(c.stamp(None, 20), 5_100);

        let mut c = StreamClock::default();
        assert_eq!(c.stamp(None, 7), 7);
        assert_eq!(c.stamp(Some(9_999), 8), 8);
    }
}
