use custodian_core::FlashConfig;
use std::time::Duration;

/// Pulse sequence for the alert flash: `pulses` rounds of on then off.
#[derive(Debug, Clone)]
pub struct AlertFlash {
    cfg: FlashConfig,
    reduced_motion: bool,
    /// Index of the next phase; even phases turn the flash on.
    phase: Option<u32>,
}

/// One step of a running sequence: the flash state to show and how long to
/// hold it. A step without a hold ends the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashStep {
    pub on: bool,
    pub hold: Option<Duration>,
}

impl AlertFlash {
    pub fn new(cfg: FlashConfig, reduced_motion: bool) -> Self {
        Self {
            cfg,
            reduced_motion,
            phase: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_some()
    }

    /// Restart the sequence from its first pulse. Returns `None` when motion
    /// is reduced or the sequence has no pulses.
    pub fn trigger(&mut self) -> Option<FlashStep> {
        self.phase = None;
        if self.reduced_motion || self.cfg.pulses == 0 {
            return None;
        }
        self.phase = Some(0);
        self.advance()
    }

    /// Move to the next phase after its hold elapsed.
    pub fn advance(&mut self) -> Option<FlashStep> {
        let phase = self.phase?;
        let total = self.cfg.pulses * 2;
        if phase >= total {
            self.phase = None;
            return Some(FlashStep {
                on: false,
                hold: None,
            });
        }
        self.phase = Some(phase + 1);
        let on = phase % 2 == 0;
        Some(FlashStep {
            on,
            hold: Some(if on { self.cfg.on() } else { self.cfg.off() }),
        })
    }
}
