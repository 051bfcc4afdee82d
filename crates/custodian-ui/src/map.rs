use crate::surface::{CommsState, MapSink};
use custodian_core::Snapshot;

/// Station sectors in display order: (id, name).
pub const SECTOR_LAYOUT: [(&str, &str); 8] = [
    ("CM", "COMMS"),
    ("DF", "DEFENSE GRID"),
    ("CC", "COMMAND"),
    ("PW", "POWER"),
    ("AR", "ARCHIVE"),
    ("ST", "STORAGE"),
    ("HG", "HANGAR"),
    ("GS", "GATEWAY"),
];

const COMMAND_SECTOR: &str = "CC";
const NO_SIGNAL: &str = "[NO SIGNAL]";

fn severity(status: &str) -> u8 {
    match status {
        "ALERT" => 1,
        "DAMAGED" => 2,
        "COMPROMISED" => 3,
        _ => 0,
    }
}

pub fn format_panel_line(label: &str, value: &str) -> String {
    format!("{label:.<10} {value}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorRow {
    pub id: &'static str,
    pub name: String,
    /// Status as shown; masked while comms are compromised.
    pub shown: String,
    pub status: String,
    /// Severity rose since the previous snapshot.
    pub recent_hit: bool,
}

/// Text sector map fed by snapshot refreshes.
#[derive(Debug, Clone, Default)]
pub struct SectorMap {
    current: Option<Snapshot>,
    recent_hits: Vec<String>,
    refreshes: usize,
}

impl SectorMap {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    pub fn comms(&self) -> CommsState {
        self.current
            .as_ref()
            .map(CommsState::from_snapshot)
            .unwrap_or_default()
    }

    pub fn meta_line(&self) -> Option<String> {
        let snap = self.current.as_ref()?;
        Some(format!(
            "TIME {}  |  THREAT {}  |  ASSAULT {}",
            snap.time, snap.threat, snap.assault
        ))
    }

    pub fn rows(&self) -> Vec<SectorRow> {
        let Some(snap) = self.current.as_ref() else {
            return Vec::new();
        };
        let masked = self.comms() == CommsState::Compromised;
        SECTOR_LAYOUT
            .iter()
            .filter_map(|&(id, layout_name)| {
                let sector = snap.sector(id)?;
                let name = if sector.name.is_empty() {
                    layout_name.to_string()
                } else {
                    sector.name.clone()
                };
                let shown = if masked && id != COMMAND_SECTOR {
                    NO_SIGNAL.to_string()
                } else {
                    sector.status.clone()
                };
                Some(SectorRow {
                    id,
                    name,
                    shown,
                    status: sector.status.clone(),
                    recent_hit: self.recent_hits.iter().any(|hit| hit == id),
                })
            })
            .collect()
    }

    pub fn panel_lines(&self) -> Vec<String> {
        let Some(snap) = self.current.as_ref() else {
            return Vec::new();
        };
        let assault = if self.comms() == CommsState::Compromised {
            format!("{}?", snap.assault)
        } else {
            snap.assault.clone()
        };
        vec![
            format_panel_line("TIME", &snap.time.to_string()),
            format_panel_line("THREAT", &snap.threat),
            format_panel_line("ASSAULT", &assault),
            format_panel_line("POSTURE", &posture(snap)),
            format_panel_line(
                "ARCHIVE",
                &format!("{} / {}", snap.archive_losses, snap.archive_limit),
            ),
        ]
    }

    pub fn is_failed(&self) -> bool {
        self.current.as_ref().is_some_and(|s| s.failed)
    }
}

fn posture(snap: &Snapshot) -> String {
    if snap.hardened {
        return "HARDENED".to_string();
    }
    if let Some(focused) = snap.focused_sector.as_deref().filter(|f| !f.is_empty()) {
        let name = SECTOR_LAYOUT
            .iter()
            .find(|(id, _)| *id == focused)
            .map(|(_, name)| *name)
            .unwrap_or(focused);
        return format!("FOCUSED ({name})");
    }
    "NONE".to_string()
}

impl MapSink for SectorMap {
    fn present(&mut self, snapshot: &Snapshot) {
        self.recent_hits = match self.current.as_ref() {
            Some(previous) => snapshot
                .sectors
                .iter()
                .filter(|sector| {
                    let before = previous
                        .sector(&sector.id)
                        .map(|s| s.status.as_str())
                        .unwrap_or("STABLE");
                    severity(&sector.status) > severity(before)
                })
                .map(|sector| sector.id.clone())
                .collect(),
            None => Vec::new(),
        };
        self.current = Some(snapshot.clone());
        self.refreshes += 1;
    }
}
