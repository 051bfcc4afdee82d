use crate::buffer::ScrollbackBuffer;
use crate::classify::{LineTag, classify, is_critical_line};
use crate::completion::Completion;
use crate::dispatch::{
    COMMAND_MODE_LINES, HELP_VERB, LINK_FAILED_LINES, LinkHealth, RefreshGate, SHORTCUT_HINT,
};
use crate::flash::{AlertFlash, FlashStep};
use crate::hint::{HintMachine, HintState, HintTimer};
use crate::history::History;
use crate::render::{ScrollMetrics, project};
use crate::surface::{CommsState, Indicator, LinkPort, MapSink, Surface};
use crate::timers::{TimerKind, Timers};
use custodian_core::{CommandRequest, CommandResponse, Snapshot, TerminalConfig, leading_verb};
use custodian_link::LinkError;
use custodian_observe::{ConsoleRecord, Observer};
use std::time::{Duration, Instant};

/// Everything that can happen to the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    /// The viewer edited the input line; carries its full new text.
    InputChanged(String),
    Submit,
    HistoryOlder,
    HistoryNewer,
    Complete {
        reverse: bool,
    },
    FocusChanged(bool),
    /// Deliberate press on the input line.
    FocusIntent,
    Scrolled(ScrollMetrics),
    Clear,
    CommandSettled {
        command_id: String,
        result: Result<CommandResponse, LinkError>,
    },
    SnapshotSettled(Result<Snapshot, LinkError>),
    /// Fire any timers that are due.
    Tick,
}

#[derive(Debug, Clone)]
struct PendingCommand {
    command_id: String,
    raw: String,
}

/// Console controller. Owns the scrollback and all input state, and talks to
/// the outside world only through the injected surface, map and port.
pub struct Console<S: Surface, M: MapSink, P: LinkPort> {
    surface: S,
    map: M,
    port: P,
    observer: Option<Observer>,

    buffer: ScrollbackBuffer,
    input: String,
    input_enabled: bool,
    cursor_on: bool,
    typing_active: bool,
    at_bottom: bool,
    unseen_output: bool,
    comms: CommsState,

    hint: HintMachine,
    history: History,
    completion: Completion,
    health: LinkHealth,
    gate: RefreshGate,
    flash: AlertFlash,
    timers: Timers,
    pending: Option<PendingCommand>,
    help_tip_shown: bool,
    keep_boot_output: bool,

    cursor_blink: Duration,
    typing_debounce: Duration,
    hint_escalation: Duration,
    scroll_threshold: usize,
}

impl<S: Surface, M: MapSink, P: LinkPort> Console<S, M, P> {
    pub fn new(surface: S, map: M, port: P, cfg: &TerminalConfig) -> Self {
        Self {
            surface,
            map,
            port,
            observer: None,
            buffer: ScrollbackBuffer::new(),
            input: String::new(),
            input_enabled: false,
            cursor_on: false,
            typing_active: false,
            at_bottom: true,
            unseen_output: false,
            comms: CommsState::Stable,
            hint: HintMachine::default(),
            history: History::default(),
            completion: Completion::new(&cfg.vocabulary),
            health: LinkHealth::new(cfg.offline_threshold),
            gate: RefreshGate::new(&cfg.refresh_verbs),
            flash: AlertFlash::new(cfg.flash, cfg.reduced_motion),
            timers: Timers::default(),
            pending: None,
            help_tip_shown: false,
            keep_boot_output: cfg.keep_boot_output,
            cursor_blink: cfg.cursor_blink(),
            typing_debounce: cfg.typing_debounce(),
            hint_escalation: cfg.hint_escalation(),
            scroll_threshold: cfg.scroll_threshold,
        }
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn handle(&mut self, event: ConsoleEvent, now: Instant) {
        match event {
            ConsoleEvent::InputChanged(text) => self.on_input(text, now),
            ConsoleEvent::Submit => self.submit(now),
            ConsoleEvent::HistoryOlder => {
                if self.input_enabled
                    && let Some(entry) = self.history.older()
                {
                    self.replace_input(entry);
                }
            }
            ConsoleEvent::HistoryNewer => {
                if self.input_enabled
                    && let Some(entry) = self.history.newer()
                {
                    self.replace_input(entry);
                }
            }
            ConsoleEvent::Complete { reverse } => {
                if !self.input_enabled {
                    return;
                }
                if let Some(replacement) = self.completion.cycle(&self.input, reverse) {
                    self.input = replacement;
                    self.timers.cancel(TimerKind::HintEscalation);
                    self.render_live();
                }
            }
            ConsoleEvent::FocusChanged(focused) => {
                let timer = self.hint.on_focus_changed(focused);
                self.apply_hint(timer, now);
            }
            ConsoleEvent::FocusIntent => {
                let timer = self.hint.on_focus_intent();
                self.apply_hint(timer, now);
            }
            ConsoleEvent::Scrolled(metrics) => {
                self.at_bottom = metrics.is_at_bottom(self.scroll_threshold);
                if self.at_bottom && self.unseen_output {
                    self.unseen_output = false;
                    self.surface.set_indicator(Indicator::UnseenOutput, false);
                }
            }
            ConsoleEvent::Clear => self.clear(),
            ConsoleEvent::CommandSettled { command_id, result } => {
                self.on_command_settled(&command_id, result, now)
            }
            ConsoleEvent::SnapshotSettled(result) => self.on_snapshot_settled(result, now),
            ConsoleEvent::Tick => self.on_tick(now),
        }
    }

    /// Announce the command interface and hand input to the viewer.
    pub fn start_command_mode(&mut self, now: Instant) {
        let lines: Vec<String> = COMMAND_MODE_LINES.iter().map(|l| l.to_string()).collect();
        self.append_lines(&lines, now);
        self.set_input_enabled(true, now);
    }

    /// Append a batch of lines: normalize alert spacing, repaint, raise the
    /// unseen-output indicator when scrolled away, and flash on critical lines.
    pub fn append_lines(&mut self, lines: &[String], now: Instant) {
        let appended = self.buffer.append(lines);
        // The viewer's own echo never raises an alert.
        let critical = appended
            .iter()
            .any(|line| classify(line) != LineTag::CommandEcho && is_critical_line(line));
        let added = !appended.is_empty();
        self.repaint();
        if added && !self.at_bottom && !self.unseen_output {
            self.unseen_output = true;
            self.surface.set_indicator(Indicator::UnseenOutput, true);
        }
        if critical {
            self.start_flash(now);
        }
    }

    /// Close out the boot transcript the surface collected on its own, keeping
    /// or dropping it per configuration, then enter command mode.
    pub fn finish_boot(&mut self, boot_text: &str, now: Instant) {
        if self.keep_boot_output {
            self.sync_from_external_text(boot_text);
        } else {
            self.clear();
        }
        self.start_command_mode(now);
    }

    /// Adopt text some other writer already put on the surface.
    pub fn sync_from_external_text(&mut self, text: &str) {
        self.buffer.replace_from_text(text);
        self.repaint();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.repaint();
    }

    pub fn set_input_enabled(&mut self, enabled: bool, now: Instant) {
        self.input_enabled = enabled;
        self.surface.set_indicator(Indicator::InputDisabled, !enabled);
        if enabled {
            self.cursor_on = true;
            self.timers
                .schedule(TimerKind::CursorBlink, now, self.cursor_blink);
            let timer = self.hint.on_enabled();
            self.apply_hint(timer, now);
            self.render_live();
        } else {
            self.cursor_on = false;
            self.typing_active = false;
            self.timers.cancel(TimerKind::CursorBlink);
            self.timers.cancel(TimerKind::TypingDecay);
            let timer = self.hint.on_disabled();
            self.apply_hint(timer, now);
            self.buffer.set_live(None);
            self.repaint();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn buffer(&self) -> &ScrollbackBuffer {
        &self.buffer
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn is_command_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_offline(&self) -> bool {
        self.health.is_offline()
    }

    pub fn failures(&self) -> u32 {
        self.health.failures()
    }

    pub fn hint_state(&self) -> HintState {
        self.hint.state()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn comms(&self) -> CommsState {
        self.comms
    }

    pub fn has_unseen_output(&self) -> bool {
        self.unseen_output
    }

    pub fn is_flashing(&self) -> bool {
        self.flash.is_running()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn surface_and_map(&mut self) -> (&mut S, &M) {
        (&mut self.surface, &self.map)
    }

    fn on_input(&mut self, text: String, now: Instant) {
        if !self.input_enabled {
            return;
        }
        self.input = text;
        self.completion.invalidate();
        self.typing_active = true;
        self.timers.cancel(TimerKind::TypingDecay);
        self.timers
            .schedule(TimerKind::TypingDecay, now, self.typing_debounce);
        if !self.input.trim().is_empty() {
            self.timers.cancel(TimerKind::HintEscalation);
        }
        self.render_live();
    }

    fn replace_input(&mut self, text: String) {
        self.input = text;
        self.completion.invalidate();
        if !self.input.is_empty() {
            self.timers.cancel(TimerKind::HintEscalation);
        }
        self.render_live();
    }

    fn submit(&mut self, now: Instant) {
        if !self.input_enabled || self.pending.is_some() {
            return;
        }
        let raw = self.input.trim().to_string();
        if raw.is_empty() {
            return;
        }

        let timer = self.hint.lock();
        self.apply_hint(timer, now);
        self.buffer.set_live(None);
        self.append_lines(&[format!("> {}", raw.to_uppercase())], now);
        self.history.record(&raw);
        self.input.clear();
        self.completion.invalidate();
        self.set_input_enabled(false, now);

        let request = CommandRequest::new(raw.clone());
        self.log(ConsoleRecord::CommandDispatched {
            command_id: request.command_id.clone(),
            verb: leading_verb(&raw),
        });
        self.pending = Some(PendingCommand {
            command_id: request.command_id.clone(),
            raw,
        });
        self.port.send_command(request);
    }

    fn on_command_settled(
        &mut self,
        command_id: &str,
        result: Result<CommandResponse, LinkError>,
        now: Instant,
    ) {
        let Some(pending) = self.pending.take_if(|p| p.command_id == command_id) else {
            self.verbose(&format!("ignoring stale command result {command_id}"));
            return;
        };

        match result {
            Ok(response) => {
                if self.health.record_success() {
                    self.surface.set_indicator(Indicator::Offline, false);
                    self.log(ConsoleRecord::OfflineChanged { offline: false });
                }
                self.log(ConsoleRecord::CommandSettled {
                    command_id: pending.command_id.clone(),
                    ok: response.ok,
                    lines: response.lines.len(),
                });
                self.append_lines(&response.lines, now);
                if !self.help_tip_shown && leading_verb(&pending.raw) == HELP_VERB {
                    self.help_tip_shown = true;
                    self.append_lines(&[SHORTCUT_HINT.to_string()], now);
                }
                self.set_input_enabled(true, now);
                if self.gate.should_refresh(&pending.raw, response.ok) {
                    self.port.fetch_snapshot();
                }
            }
            Err(err) => {
                let went_offline = self.health.record_failure();
                self.log(ConsoleRecord::LinkFailed {
                    command_id: pending.command_id.clone(),
                    failures: self.health.failures(),
                    error: err.to_string(),
                });
                let lines: Vec<String> = LINK_FAILED_LINES.iter().map(|l| l.to_string()).collect();
                self.append_lines(&lines, now);
                if went_offline {
                    self.surface.set_indicator(Indicator::Offline, true);
                    self.log(ConsoleRecord::OfflineChanged { offline: true });
                }
                self.set_input_enabled(true, now);
            }
        }
    }

    fn on_snapshot_settled(&mut self, result: Result<Snapshot, LinkError>, now: Instant) {
        match result {
            Ok(snapshot) => {
                self.map.present(&snapshot);
                self.comms = CommsState::from_snapshot(&snapshot);
                self.surface.set_comms(self.comms);
                self.log(ConsoleRecord::SnapshotRefreshed {
                    time: snapshot.time,
                    sectors: snapshot.sectors.len(),
                });
                if let Some(notice) = self.gate.take_notice() {
                    self.append_lines(&[notice.to_string()], now);
                }
            }
            Err(err) => {
                self.verbose(&format!("snapshot refresh skipped: {err}"));
                self.log(ConsoleRecord::SnapshotFailed {
                    error: err.to_string(),
                });
            }
        }
    }

    fn on_tick(&mut self, now: Instant) {
        for kind in self.timers.take_due(now) {
            match kind {
                TimerKind::CursorBlink => {
                    if self.input_enabled {
                        self.cursor_on = !self.cursor_on;
                        self.timers
                            .schedule(TimerKind::CursorBlink, now, self.cursor_blink);
                        self.render_live();
                    }
                }
                TimerKind::TypingDecay => self.typing_active = false,
                TimerKind::HintEscalation => {
                    if self.hint.escalate(self.input.trim().is_empty()) {
                        self.surface.show_hint(self.hint.view());
                    }
                }
                TimerKind::FlashPulse => {
                    if let Some(step) = self.flash.advance() {
                        self.apply_flash(step, now);
                    }
                }
            }
        }
    }

    fn start_flash(&mut self, now: Instant) {
        self.timers.cancel(TimerKind::FlashPulse);
        if let Some(step) = self.flash.trigger() {
            self.apply_flash(step, now);
        }
    }

    fn apply_flash(&mut self, step: FlashStep, now: Instant) {
        self.surface.set_flash(step.on);
        match step.hold {
            Some(hold) => self.timers.schedule(TimerKind::FlashPulse, now, hold),
            None => self.timers.cancel(TimerKind::FlashPulse),
        }
    }

    fn apply_hint(&mut self, timer: HintTimer, now: Instant) {
        match timer {
            HintTimer::Start => {
                self.timers.cancel(TimerKind::HintEscalation);
                self.timers
                    .schedule(TimerKind::HintEscalation, now, self.hint_escalation);
            }
            HintTimer::Cancel => self.timers.cancel(TimerKind::HintEscalation),
            HintTimer::Keep => {}
        }
        self.surface.show_hint(self.hint.view());
    }

    fn live_line(&self) -> String {
        let cursor = if self.cursor_on && !self.typing_active {
            "_"
        } else {
            ""
        };
        format!("> {}{cursor}", self.input.to_uppercase())
    }

    /// Replace the overlay line and repaint. No-op while input is disabled.
    fn render_live(&mut self) {
        if !self.input_enabled {
            return;
        }
        self.buffer.set_live(Some(self.live_line()));
        self.repaint();
    }

    fn repaint(&mut self) {
        self.surface.paint(project(&self.buffer), self.at_bottom);
    }

    fn log(&self, record: ConsoleRecord) {
        if let Some(observer) = &self.observer {
            let _ = observer.record(&record);
        }
    }

    fn verbose(&self, msg: &str) {
        if let Some(observer) = &self.observer {
            observer.verbose_log(msg);
        }
    }
}
