use crate::console::{Console, ConsoleEvent};
use crate::map::SectorMap;
use crate::surface::LinkPort;
use crate::tui::TuiSurface;
use anyhow::Result;
use crossterm::event::{
    self, DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
    EnableFocusChange, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use custodian_core::{AppConfig, CommandRequest, LinkConfig};
use custodian_link::{BootFeed, BootSource, ConsoleLink};
use custodian_observe::{ConsoleRecord, Observer};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const WHEEL_ROWS: isize = 3;

/// Messages delivered to the UI thread from worker threads.
#[derive(Debug)]
pub enum RuntimeMsg {
    Console(ConsoleEvent),
    BootLine(String),
    /// The boot feed is exhausted. Carries the fallback reason when the local
    /// script was used, and the stall reason when the stream went quiet.
    BootFinished {
        fallback: Option<String>,
        stalled: Option<String>,
    },
}

/// Runs each link request on its own short-lived thread and posts the result
/// back over the runtime channel.
pub struct ThreadedPort {
    link: Arc<dyn ConsoleLink>,
    tx: mpsc::Sender<RuntimeMsg>,
}

impl ThreadedPort {
    pub fn new(link: Arc<dyn ConsoleLink>, tx: mpsc::Sender<RuntimeMsg>) -> Self {
        Self { link, tx }
    }
}

impl LinkPort for ThreadedPort {
    fn send_command(&mut self, request: CommandRequest) {
        let link = Arc::clone(&self.link);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = link.send_command(&request);
            let _ = tx.send(RuntimeMsg::Console(ConsoleEvent::CommandSettled {
                command_id: request.command_id,
                result,
            }));
        });
    }

    fn fetch_snapshot(&mut self) {
        let link = Arc::clone(&self.link);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = link.fetch_snapshot();
            let _ = tx.send(RuntimeMsg::Console(ConsoleEvent::SnapshotSettled(result)));
        });
    }
}

/// Play the boot feed onto the channel, one message per line.
pub fn spawn_boot(link: Arc<dyn ConsoleLink>, cfg: &LinkConfig, tx: mpsc::Sender<RuntimeMsg>) {
    let (first_data, idle) = (cfg.boot_first_data(), cfg.boot_idle());
    thread::spawn(move || {
        let mut feed = BootFeed::open(link, first_data, idle);
        for line in feed.by_ref() {
            if tx.send(RuntimeMsg::BootLine(line)).is_err() {
                return;
            }
        }
        let fallback = match feed.source() {
            BootSource::Fallback => feed.fallback_reason().map(str::to_string),
            BootSource::Stream => None,
        };
        let stalled = feed.stall_reason().map(str::to_string);
        let _ = tx.send(RuntimeMsg::BootFinished { fallback, stalled });
    });
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    Exit,
    Console(ConsoleEvent),
    /// Scroll by this many pages; negative is up.
    ScrollPages(isize),
    Ignore,
}

/// Translate a key press into an action, given the current input text.
pub fn map_key(key: KeyEvent, input: &str) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => KeyAction::Exit,
        KeyCode::Char('l') if ctrl => KeyAction::Console(ConsoleEvent::Clear),
        KeyCode::Char('u') if ctrl => KeyAction::Console(ConsoleEvent::InputChanged(String::new())),
        KeyCode::Char(_) if ctrl => KeyAction::Ignore,
        KeyCode::Char(c) => {
            let mut text = input.to_string();
            text.push(c);
            KeyAction::Console(ConsoleEvent::InputChanged(text))
        }
        KeyCode::Backspace => {
            let mut text = input.to_string();
            text.pop();
            KeyAction::Console(ConsoleEvent::InputChanged(text))
        }
        KeyCode::Enter => KeyAction::Console(ConsoleEvent::Submit),
        KeyCode::Up => KeyAction::Console(ConsoleEvent::HistoryOlder),
        KeyCode::Down => KeyAction::Console(ConsoleEvent::HistoryNewer),
        KeyCode::Tab => KeyAction::Console(ConsoleEvent::Complete { reverse: false }),
        KeyCode::BackTab => KeyAction::Console(ConsoleEvent::Complete { reverse: true }),
        KeyCode::PageUp => KeyAction::ScrollPages(-1),
        KeyCode::PageDown => KeyAction::ScrollPages(1),
        _ => KeyAction::Ignore,
    }
}

/// RAII guard that puts the terminal back on drop (including panics).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(
        io::stdout(),
        DisableBracketedPaste,
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen,
        crossterm::cursor::Show
    );
}

type TuiConsole = Console<TuiSurface, SectorMap, ThreadedPort>;

/// Run the interactive console until the viewer exits.
pub fn run_console(
    config: &AppConfig,
    link: Arc<dyn ConsoleLink>,
    observer: Observer,
    run_boot: bool,
) -> Result<()> {
    // Install a SIGINT handler that sets a flag instead of killing the process.
    let sigint_flag = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        let flag = Arc::clone(&sigint_flag);
        signal_hook::flag::register(signal_hook::consts::SIGINT, flag)?;
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        prev_hook(info);
    }));

    enable_raw_mode()?;
    let _guard = TerminalGuard;
    crossterm::execute!(
        io::stdout(),
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange,
        EnableBracketedPaste,
        crossterm::cursor::Hide
    )?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let (tx, rx) = mpsc::channel::<RuntimeMsg>();
    let port = ThreadedPort::new(Arc::clone(&link), tx.clone());
    let mut console = Console::new(TuiSurface::new(), SectorMap::default(), port, &config.terminal)
        .with_observer(observer.clone());

    // Terminals only report focus changes, so assume we start focused.
    console.handle(ConsoleEvent::FocusChanged(true), Instant::now());
    if run_boot {
        spawn_boot(Arc::clone(&link), &config.link, tx.clone());
    } else {
        console.start_command_mode(Instant::now());
    }
    drop(tx);

    loop {
        if sigint_flag.swap(false, Ordering::SeqCst) {
            break;
        }

        while let Ok(msg) = rx.try_recv() {
            apply_runtime_msg(&mut console, msg, &observer);
        }
        console.handle(ConsoleEvent::Tick, Instant::now());

        terminal.draw(|frame| {
            let (surface, map) = console.surface_and_map();
            surface.draw(frame, map);
        })?;

        let now = Instant::now();
        let timeout = console
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .map_or(FRAME_INTERVAL, |wait| wait.min(FRAME_INTERVAL));
        if !event::poll(timeout)? {
            continue;
        }
        let now = Instant::now();
        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match map_key(key, console.input()) {
                    KeyAction::Exit => break,
                    KeyAction::Console(ev) => console.handle(ev, now),
                    KeyAction::ScrollPages(pages) => {
                        let rows = console.surface().page_rows() * pages;
                        let metrics = console.surface_mut().scroll_by(rows);
                        console.handle(ConsoleEvent::Scrolled(metrics), now);
                    }
                    KeyAction::Ignore => {}
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => {
                    let metrics = console.surface_mut().scroll_by(-WHEEL_ROWS);
                    console.handle(ConsoleEvent::Scrolled(metrics), now);
                }
                MouseEventKind::ScrollDown => {
                    let metrics = console.surface_mut().scroll_by(WHEEL_ROWS);
                    console.handle(ConsoleEvent::Scrolled(metrics), now);
                }
                MouseEventKind::Down(MouseButton::Left)
                    if console.surface().hits_input(mouse.column, mouse.row) =>
                {
                    console.handle(ConsoleEvent::FocusIntent, now);
                }
                _ => {}
            },
            Event::FocusGained => console.handle(ConsoleEvent::FocusChanged(true), now),
            Event::FocusLost => console.handle(ConsoleEvent::FocusChanged(false), now),
            Event::Paste(pasted) => {
                let mut text = console.input().to_string();
                text.extend(pasted.chars().filter(|c| !c.is_control()));
                console.handle(ConsoleEvent::InputChanged(text), now);
            }
            Event::Resize(_, _) => {}
        }
    }

    Ok(())
}

fn apply_runtime_msg(console: &mut TuiConsole, msg: RuntimeMsg, observer: &Observer) {
    let now = Instant::now();
    match msg {
        RuntimeMsg::Console(ev) => console.handle(ev, now),
        RuntimeMsg::BootLine(line) => console.surface_mut().write_external(&line),
        RuntimeMsg::BootFinished { fallback, stalled } => {
            if let Some(reason) = fallback {
                observer.verbose_log(&format!("boot stream unavailable, local script used: {reason}"));
                let _ = observer.record(&ConsoleRecord::BootFallback { reason });
            }
            if let Some(reason) = stalled {
                observer.verbose_log(&format!("boot transcript cut short: {reason}"));
            }
            let text = console.surface_mut().take_external_text();
            console.finish_boot(&text, now);
        }
    }
}
