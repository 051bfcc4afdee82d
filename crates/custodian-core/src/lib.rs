use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

pub type Result<T> = anyhow::Result<T>;

/// Address of the game server when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:7331";

/// Command tokens offered by tab completion.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "STATUS",
    "WAIT",
    "HELP",
    "DEPLOY",
    "MOVE",
    "RETURN",
    "FOCUS",
    "HARDEN",
    "REPAIR",
    "SCAVENGE",
    "SET",
    "FORTIFY",
    "POLICY",
    "CONFIG",
    "ALLOCATE",
    "FAB",
    "SCAN",
    "STABILIZE",
    "SYNC",
    "REROUTE",
    "BOOST",
    "DRONE",
    "LOCKDOWN",
    "PRIORITIZE",
    "RESET",
    "REBOOT",
];

/// Verbs that mutate world state; a successful one is followed by a snapshot refresh.
pub const DEFAULT_REFRESH_VERBS: &[&str] = &[
    "WAIT", "RESET", "REBOOT", "FOCUS", "HARDEN", "SCAVENGE", "REPAIR", "DEPLOY", "MOVE", "RETURN",
    "CONFIG", "STATUS", "ALLOCATE", "FAB", "SET", "FORTIFY",
];

pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".custodian")
}

/// Fresh opaque correlation id for one command round trip.
pub fn new_command_id() -> String {
    Uuid::now_v7().to_string()
}

/// First whitespace-delimited token of a directive, uppercased. Empty input yields "".
pub fn leading_verb(raw: &str) -> String {
    raw.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub raw: String,
    pub command_id: String,
}

impl CommandRequest {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            command_id: new_command_id(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub ok: bool,
    pub lines: Vec<String>,
}

impl CommandResponse {
    /// Coerce an arbitrary JSON payload into a response.
    ///
    /// A missing or non-boolean `ok` reads as `false`; a missing or non-array
    /// `lines` reads as empty. Non-string entries are stringified and nulls dropped.
    pub fn from_value(value: &Value) -> Self {
        let ok = value.get("ok").and_then(Value::as_bool).unwrap_or(false);
        let lines = value
            .get("lines")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(coerce_line).collect())
            .unwrap_or_default();
        Self { ok, lines }
    }
}

fn coerce_line(item: &Value) -> Option<String> {
    match item {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub status: String,
}

/// World snapshot as reported by the server. Unknown fields are ignored and
/// missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(deserialize_with = "lenient_time")]
    pub time: u64,
    #[serde(deserialize_with = "lenient_text")]
    pub threat: String,
    #[serde(deserialize_with = "lenient_text")]
    pub assault: String,
    pub sectors: Vec<SectorRecord>,
    #[serde(deserialize_with = "lenient_lines")]
    pub operator_log: Vec<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub archive_losses: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub archive_limit: u32,
    pub player_mode: Option<String>,
    pub posture: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub hardened: bool,
    pub focused_sector: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub failed: bool,
}

impl Snapshot {
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            anyhow::bail!("snapshot payload is not an object");
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn sector(&self, id: &str) -> Option<&SectorRecord> {
        self.sectors.iter().find(|s| s.id == id)
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

fn lenient_time<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let time = lenient_time(deserializer)?;
    Ok(u32::try_from(time).unwrap_or(u32::MAX))
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn lenient_lines<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(coerce_line).collect(),
        _ => Vec::new(),
    })
}

// ─── Configuration ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkConfig,
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub base_url: String,
    pub command_path: String,
    pub snapshot_path: String,
    pub boot_stream_path: String,
    pub timeout_seconds: u64,
    /// How long the boot stream may stay silent before the local script takes over.
    pub boot_first_data_ms: u64,
    /// How long the boot stream may stall between lines once it has started.
    pub boot_idle_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            command_path: "/command".to_string(),
            snapshot_path: "/snapshot".to_string(),
            boot_stream_path: "/stream/boot".to_string(),
            timeout_seconds: 10,
            boot_first_data_ms: 800,
            boot_idle_ms: 5000,
        }
    }
}

impl LinkConfig {
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn command_url(&self) -> String {
        self.endpoint(&self.command_path)
    }

    pub fn snapshot_url(&self) -> String {
        self.endpoint(&self.snapshot_path)
    }

    pub fn boot_stream_url(&self) -> String {
        self.endpoint(&self.boot_stream_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn boot_first_data(&self) -> Duration {
        Duration::from_millis(self.boot_first_data_ms)
    }

    pub fn boot_idle(&self) -> Duration {
        Duration::from_millis(self.boot_idle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cursor_blink_ms: u64,
    pub typing_debounce_ms: u64,
    pub hint_escalation_ms: u64,
    /// Rows from the end that still count as "at the bottom".
    pub scroll_threshold: usize,
    pub offline_threshold: u32,
    pub reduced_motion: bool,
    /// Keep the boot transcript in the log when command mode starts.
    pub keep_boot_output: bool,
    pub vocabulary: Vec<String>,
    pub refresh_verbs: Vec<String>,
    pub flash: FlashConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cursor_blink_ms: 420,
            typing_debounce_ms: 220,
            hint_escalation_ms: 5000,
            scroll_threshold: 8,
            offline_threshold: 3,
            reduced_motion: false,
            keep_boot_output: true,
            vocabulary: DEFAULT_VOCABULARY.iter().map(|s| s.to_string()).collect(),
            refresh_verbs: DEFAULT_REFRESH_VERBS.iter().map(|s| s.to_string()).collect(),
            flash: FlashConfig::default(),
        }
    }
}

impl TerminalConfig {
    pub fn cursor_blink(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_ms.max(1))
    }

    pub fn typing_debounce(&self) -> Duration {
        Duration::from_millis(self.typing_debounce_ms)
    }

    pub fn hint_escalation(&self) -> Duration {
        Duration::from_millis(self.hint_escalation_ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlashConfig {
    pub pulses: u32,
    pub on_ms: u64,
    pub off_ms: u64,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            pulses: 3,
            on_ms: 120,
            off_ms: 90,
        }
    }
}

impl FlashConfig {
    pub fn on(&self) -> Duration {
        Duration::from_millis(self.on_ms)
    }

    pub fn off(&self) -> Duration {
        Duration::from_millis(self.off_ms)
    }
}

impl AppConfig {
    pub fn user_settings_path() -> Option<PathBuf> {
        let home = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())?;
        Some(Path::new(&home).join(".custodian/settings.json"))
    }

    pub fn project_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    pub fn project_local_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.local.json")
    }

    pub fn legacy_toml_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("config.toml")
    }

    /// Layered load: defaults, legacy TOML, user settings, project settings,
    /// project-local settings. Later layers win key by key.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        let legacy = Self::legacy_toml_path(workspace);
        if legacy.exists() {
            let raw = fs::read_to_string(legacy)?;
            let legacy_cfg: AppConfig = toml::from_str(&raw)?;
            merge_json_value(&mut merged, &serde_json::to_value(legacy_cfg)?);
        }

        let mut paths = Vec::new();
        if let Some(user) = Self::user_settings_path() {
            paths.push(user);
        }
        paths.push(Self::project_settings_path(workspace));
        paths.push(Self::project_local_settings_path(workspace));

        for path in paths {
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(path)?;
            let value: Value = serde_json::from_str(&raw)?;
            merge_json_value(&mut merged, &value);
        }

        Ok(serde_json::from_value(merged)?)
    }
}

fn merge_json_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_obj), Value::Object(overlay_obj)) => {
            for (key, overlay_value) in overlay_obj {
                if let Some(base_value) = base_obj.get_mut(key) {
                    merge_json_value(base_value, overlay_value);
                } else {
                    base_obj.insert(key.clone(), overlay_value.clone());
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}
