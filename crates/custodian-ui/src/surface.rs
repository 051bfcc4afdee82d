//! Seams between the console controller and the outside world.
//!
//! The controller never draws, sleeps, or blocks. It pushes presentation
//! state into a [`Surface`], hands snapshots to a [`MapSink`], and starts
//! requests through a [`LinkPort`] whose results come back later as events.

use crate::render::RenderedLine;
use custodian_core::{CommandRequest, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Output arrived while the viewer was scrolled away from the bottom.
    UnseenOutput,
    /// Repeated command link failures.
    Offline,
    /// A command round trip is in progress.
    InputDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintView {
    pub primary: &'static str,
    pub secondary: Option<&'static str>,
    pub faded: bool,
}

/// Comms sector condition, which tints the console frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommsState {
    #[default]
    Stable,
    Alert,
    Damaged,
    Compromised,
}

impl CommsState {
    pub fn from_status(status: &str) -> Self {
        match status {
            "ALERT" => Self::Alert,
            "DAMAGED" => Self::Damaged,
            "COMPROMISED" => Self::Compromised,
            _ => Self::Stable,
        }
    }

    /// Read from the `CM` sector; a snapshot without one reads as stable.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        snapshot
            .sector("CM")
            .map(|s| Self::from_status(&s.status))
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::Alert => "ALERT",
            Self::Damaged => "DAMAGED",
            Self::Compromised => "COMPROMISED",
        }
    }
}

pub trait Surface {
    /// Replace the displayed log. `follow_tail` asks the surface to scroll to
    /// the newest line; otherwise it keeps its current position.
    fn paint(&mut self, lines: Vec<RenderedLine>, follow_tail: bool);

    fn set_indicator(&mut self, indicator: Indicator, on: bool);

    fn show_hint(&mut self, hint: Option<HintView>);

    fn set_flash(&mut self, on: bool);

    fn set_comms(&mut self, comms: CommsState);
}

/// Receives every refreshed world snapshot.
pub trait MapSink {
    fn present(&mut self, snapshot: &Snapshot);
}

/// Starts link requests without waiting for them. Results are delivered back
/// as `ConsoleEvent::CommandSettled` and `ConsoleEvent::SnapshotSettled`.
pub trait LinkPort {
    fn send_command(&mut self, request: CommandRequest);

    fn fetch_snapshot(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_core::SectorRecord;

    #[test]
    fn comms_state_reads_cm_sector() {
        let mut snapshot = Snapshot::default();
        assert_eq!(CommsState::from_snapshot(&snapshot), CommsState::Stable);
        snapshot.sectors.push(SectorRecord {
            id: "CM".to_string(),
            name: "COMMS".to_string(),
            status: "COMPROMISED".to_string(),
        });
        assert_eq!(
            CommsState::from_snapshot(&snapshot),
            CommsState::Compromised
        );
        assert_eq!(CommsState::from_status("weird"), CommsState::Stable);
        assert_eq!(CommsState::Damaged.label(), "DAMAGED");
    }
}
