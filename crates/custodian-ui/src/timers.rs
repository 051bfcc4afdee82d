use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    CursorBlink,
    TypingDecay,
    HintEscalation,
    FlashPulse,
}

/// One pending deadline per kind. Scheduling a kind replaces its previous
/// deadline, so a timer can never overlap with itself.
#[derive(Debug, Clone, Default)]
pub struct Timers {
    deadlines: HashMap<TimerKind, Instant>,
}

impl Timers {
    pub fn schedule(&mut self, kind: TimerKind, now: Instant, after: Duration) {
        self.deadlines.insert(kind, now + after);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.deadlines.remove(&kind);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every timer due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<(Instant, TimerKind)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(kind, at)| (*at, *kind))
            .collect();
        due.sort_by_key(|(at, _)| *at);
        for (_, kind) in &due {
            self.deadlines.remove(kind);
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reschedule_replaces_previous_deadline() {
        let start = Instant::now();
        let mut timers = Timers::default();
        timers.schedule(TimerKind::TypingDecay, start, Duration::from_millis(220));
        timers.schedule(
            TimerKind::TypingDecay,
            start + Duration::from_millis(100),
            Duration::from_millis(220),
        );
        assert!(timers.take_due(start + Duration::from_millis(250)).is_empty());
        assert_eq!(
            timers.take_due(start + Duration::from_millis(320)),
            vec![TimerKind::TypingDecay]
        );
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn due_timers_come_out_in_deadline_order() {
        let start = Instant::now();
        let mut timers = Timers::default();
        timers.schedule(TimerKind::CursorBlink, start, Duration::from_millis(420));
        timers.schedule(TimerKind::FlashPulse, start, Duration::from_millis(120));
        assert_eq!(
            timers.next_deadline(),
            Some(start + Duration::from_millis(120))
        );
        assert_eq!(
            timers.take_due(start + Duration::from_secs(1)),
            vec![TimerKind::FlashPulse, TimerKind::CursorBlink]
        );
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn cancel_removes_deadline() {
        let start = Instant::now();
        let mut timers = Timers::default();
        timers.schedule(TimerKind::HintEscalation, start, Duration::from_secs(5));
        timers.cancel(TimerKind::HintEscalation);
        assert!(timers.take_due(start + Duration::from_secs(10)).is_empty());
    }
}
