use crate::ConsoleLink;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Local boot script used when the server stream is silent or unavailable.
pub const FALLBACK_BOOT_LINES: &[&str] = &[
    "[ SYSTEM POWER: UNSTABLE ]",
    "[ AUXILIARY POWER ROUTED ]",
    "",
    "CUSTODIAN NODE - ONLINE",
    "STATUS: DEGRADED",
    "",
    "> Running integrity check...",
    "> Memory blocks: 12% intact",
    "> Long-range comms: OFFLINE",
    "> Archive uplink: INACCESSIBLE",
    "> Automated defense grid: PARTIAL",
    "",
    "DIRECTIVE FOUND",
    "RETENTION MANDATE - ACTIVE",
    "",
    "WARNING:",
    "Issuing authority presumed defunct.",
    "",
    "Residual Authority accepted.",
    "",
    "Initializing Custodian Interface...",
];

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    pub fn is_done(&self) -> bool {
        self.event.as_deref() == Some("done")
    }
}

/// Line-at-a-time event-stream decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    event: Option<String>,
    data: Vec<String>,
    pending: bool,
}

impl SseDecoder {
    /// Feed one line (without its terminator). Returns a frame when a blank
    /// line closes one.
    pub fn push_line(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return self.flush();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => return None,
        }
        self.pending = true;
        None
    }

    /// Flush a frame left open when the stream ended without a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        self.flush()
    }

    fn flush(&mut self) -> Option<SseFrame> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    Stream,
    Fallback,
}

enum FeedMsg {
    Line(String),
    Done,
    Failed(String),
}

/// Iterator over boot lines. Reads the server stream on a worker thread and
/// switches to [`FALLBACK_BOOT_LINES`] when nothing arrives within the
/// first-data window or the stream fails before its first line. A stream that
/// goes quiet for longer than the idle window after that simply ends.
pub struct BootFeed {
    rx: Option<Receiver<FeedMsg>>,
    fallback: Option<std::slice::Iter<'static, &'static str>>,
    fallback_reason: Option<String>,
    stall_reason: Option<String>,
    first_data: Duration,
    idle: Duration,
    received_any: bool,
}

impl BootFeed {
    pub fn open(link: Arc<dyn ConsoleLink>, first_data: Duration, idle: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let reader = match link.open_boot_stream() {
                Ok(reader) => reader,
                Err(err) => {
                    let _ = tx.send(FeedMsg::Failed(err.to_string()));
                    return;
                }
            };
            let mut decoder = SseDecoder::default();
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        let _ = tx.send(FeedMsg::Failed(err.to_string()));
                        return;
                    }
                };
                if let Some(frame) = decoder.push_line(&line) {
                    if frame.is_done() {
                        let _ = tx.send(FeedMsg::Done);
                        return;
                    }
                    if tx.send(FeedMsg::Line(frame.data)).is_err() {
                        return;
                    }
                }
            }
            if let Some(frame) = decoder.finish()
                && !frame.is_done()
            {
                let _ = tx.send(FeedMsg::Line(frame.data));
            }
            let _ = tx.send(FeedMsg::Done);
        });
        Self {
            rx: Some(rx),
            fallback: None,
            fallback_reason: None,
            stall_reason: None,
            first_data,
            idle,
            received_any: false,
        }
    }

    pub fn source(&self) -> BootSource {
        if self.fallback.is_some() {
            BootSource::Fallback
        } else {
            BootSource::Stream
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    /// Set when a started stream was cut short for going quiet.
    pub fn stall_reason(&self) -> Option<&str> {
        self.stall_reason.as_deref()
    }

    fn switch_to_fallback(&mut self, reason: String) {
        self.rx = None;
        self.fallback = Some(FALLBACK_BOOT_LINES.iter());
        self.fallback_reason = Some(reason);
    }
}

impl Iterator for BootFeed {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if let Some(lines) = self.fallback.as_mut() {
            return lines.next().map(|line| line.to_string());
        }
        let rx = self.rx.as_ref()?;
        let msg = if self.received_any {
            match rx.recv_timeout(self.idle) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => {
                    let ms = self.idle.as_millis();
                    self.stall_reason = Some(format!("boot stream stalled for {ms}ms"));
                    self.rx = None;
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => None,
            }
        } else {
            match rx.recv_timeout(self.first_data) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => {
                    let ms = self.first_data.as_millis();
                    self.switch_to_fallback(format!("no boot data within {ms}ms"));
                    return self.next();
                }
                Err(RecvTimeoutError::Disconnected) => None,
            }
        };
        match msg {
            Some(FeedMsg::Line(line)) => {
                self.received_any = true;
                Some(line)
            }
            Some(FeedMsg::Failed(reason)) if !self.received_any => {
                self.switch_to_fallback(reason);
                self.next()
            }
            Some(FeedMsg::Done) | None if !self.received_any => {
                self.switch_to_fallback("boot stream ended without data".to_string());
                self.next()
            }
            Some(FeedMsg::Failed(_)) | Some(FeedMsg::Done) | None => {
                self.rx = None;
                None
            }
        }
    }
}
