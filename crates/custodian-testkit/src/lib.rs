//! Deterministic fakes for driving the console without a terminal or server.

use custodian_core::{CommandRequest, CommandResponse, Snapshot, TerminalConfig};
use custodian_link::{ConsoleLink, LinkError};
use custodian_ui::{
    CommsState, Console, ConsoleEvent, HintView, Indicator, LinkPort, MapSink, RenderedLine,
    ScrollMetrics, Surface,
};
use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, Cursor};
use std::sync::Mutex;
use std::time::{Duration, Instant};

mod server;

pub use server::{MockResponse, MockServer, RecordedRequest};

// ─── Link fakes ─────────────────────────────────────────────────────────────

/// A [`ConsoleLink`] that replays queued results and records every request.
#[derive(Default)]
pub struct ScriptedLink {
    commands: Mutex<VecDeque<Result<CommandResponse, LinkError>>>,
    snapshots: Mutex<VecDeque<Result<Snapshot, LinkError>>>,
    boot_body: Option<String>,
    sent: Mutex<Vec<CommandRequest>>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(self, result: Result<CommandResponse, LinkError>) -> Self {
        if let Ok(mut queue) = self.commands.lock() {
            queue.push_back(result);
        }
        self
    }

    pub fn with_snapshot(self, result: Result<Snapshot, LinkError>) -> Self {
        if let Ok(mut queue) = self.snapshots.lock() {
            queue.push_back(result);
        }
        self
    }

    /// Raw event-stream text served by `open_boot_stream`.
    pub fn with_boot_stream(mut self, body: impl Into<String>) -> Self {
        self.boot_body = Some(body.into());
        self
    }

    pub fn sent(&self) -> Vec<CommandRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ConsoleLink for ScriptedLink {
    fn send_command(&self, request: &CommandRequest) -> Result<CommandResponse, LinkError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }
        self.commands
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err(LinkError::Transport("no scripted response".to_string())))
    }

    fn fetch_snapshot(&self) -> Result<Snapshot, LinkError> {
        self.snapshots
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err(LinkError::Transport("no scripted snapshot".to_string())))
    }

    fn open_boot_stream(&self) -> Result<Box<dyn BufRead + Send>, LinkError> {
        match &self.boot_body {
            Some(body) => Ok(Box::new(Cursor::new(body.clone().into_bytes()))),
            None => Err(LinkError::Transport("boot stream refused".to_string())),
        }
    }
}

pub fn ok_response(lines: &[&str]) -> CommandResponse {
    CommandResponse {
        ok: true,
        lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

pub fn transport_failure() -> LinkError {
    LinkError::Transport("connection refused".to_string())
}

// ─── Console collaborators ──────────────────────────────────────────────────

/// Surface that keeps everything the console pushed into it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub lines: Vec<RenderedLine>,
    pub paints: usize,
    pub last_follow_tail: bool,
    pub indicators: HashMap<Indicator, bool>,
    pub hint: Option<HintView>,
    pub flashes: Vec<bool>,
    pub comms: Vec<CommsState>,
}

impl RecordingSurface {
    pub fn indicator(&self, indicator: Indicator) -> bool {
        self.indicators.get(&indicator).copied().unwrap_or(false)
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }

    pub fn last_text(&self) -> Option<&str> {
        self.lines.last().map(|l| l.text.as_str())
    }
}

impl Surface for RecordingSurface {
    fn paint(&mut self, lines: Vec<RenderedLine>, follow_tail: bool) {
        self.lines = lines;
        self.paints += 1;
        self.last_follow_tail = follow_tail;
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.indicators.insert(indicator, on);
    }

    fn show_hint(&mut self, hint: Option<HintView>) {
        self.hint = hint;
    }

    fn set_flash(&mut self, on: bool) {
        self.flashes.push(on);
    }

    fn set_comms(&mut self, comms: CommsState) {
        self.comms.push(comms);
    }
}

#[derive(Debug, Default)]
pub struct RecordingMap {
    pub presented: Vec<Snapshot>,
}

impl MapSink for RecordingMap {
    fn present(&mut self, snapshot: &Snapshot) {
        self.presented.push(snapshot.clone());
    }
}

/// Port that records requests instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingPort {
    pub commands: Vec<CommandRequest>,
    pub snapshot_requests: usize,
}

impl LinkPort for RecordingPort {
    fn send_command(&mut self, request: CommandRequest) {
        self.commands.push(request);
    }

    fn fetch_snapshot(&mut self) {
        self.snapshot_requests += 1;
    }
}

// ─── Harness ────────────────────────────────────────────────────────────────

pub type TestConsole = Console<RecordingSurface, RecordingMap, RecordingPort>;

/// A console on fake collaborators with a hand-advanced clock.
pub struct ConsoleHarness {
    pub console: TestConsole,
    pub now: Instant,
}

impl ConsoleHarness {
    pub fn new(cfg: &TerminalConfig) -> Self {
        Self {
            console: Console::new(
                RecordingSurface::default(),
                RecordingMap::default(),
                RecordingPort::default(),
                cfg,
            ),
            now: Instant::now(),
        }
    }

    /// A console already in command mode.
    pub fn started(cfg: &TerminalConfig) -> Self {
        let mut harness = Self::new(cfg);
        harness.console.start_command_mode(harness.now);
        harness
    }

    pub fn send(&mut self, event: ConsoleEvent) {
        self.console.handle(event, self.now);
    }

    /// Move the clock forward and fire whatever came due.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        self.send(ConsoleEvent::Tick);
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn type_text(&mut self, text: &str) {
        let mut current = self.console.input().to_string();
        for c in text.chars() {
            current.push(c);
            self.send(ConsoleEvent::InputChanged(current.clone()));
        }
    }

    /// Type and submit a directive. Returns the id of the request it produced.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        self.send(ConsoleEvent::InputChanged(String::new()));
        self.type_text(text);
        let before = self.port().commands.len();
        self.send(ConsoleEvent::Submit);
        let commands = &self.port().commands;
        if commands.len() > before {
            commands.last().map(|r| r.command_id.clone())
        } else {
            None
        }
    }

    /// Report a scroll position as the surface would.
    pub fn scroll(&mut self, offset: usize, viewport: usize, content: usize) {
        self.send(ConsoleEvent::Scrolled(ScrollMetrics {
            offset,
            viewport,
            content,
        }));
    }

    pub fn settle(&mut self, command_id: &str, result: Result<CommandResponse, LinkError>) {
        self.send(ConsoleEvent::CommandSettled {
            command_id: command_id.to_string(),
            result,
        });
    }

    /// Submit and immediately settle with the given result.
    pub fn round_trip(&mut self, text: &str, result: Result<CommandResponse, LinkError>) {
        if let Some(id) = self.submit(text) {
            self.settle(&id, result);
        }
    }

    pub fn surface(&self) -> &RecordingSurface {
        self.console.surface()
    }

    pub fn map(&self) -> &RecordingMap {
        self.console.map()
    }

    pub fn port(&self) -> &RecordingPort {
        self.console.port()
    }

    pub fn lines(&self) -> Vec<String> {
        self.console.buffer().lines().to_vec()
    }
}

pub fn sample_snapshot(comms_status: &str) -> Snapshot {
    let value = serde_json::json!({
        "time": 4,
        "threat": "ELEVATED",
        "assault": "NONE",
        "sectors": [
            {"id": "CM", "name": "COMMS", "status": comms_status},
            {"id": "CC", "name": "COMMAND", "status": "STABLE"},
            {"id": "PW", "name": "POWER", "status": "ALERT"}
        ],
        "archive_losses": 0,
        "archive_limit": 3
    });
    Snapshot::from_value(value).unwrap_or_default()
}
