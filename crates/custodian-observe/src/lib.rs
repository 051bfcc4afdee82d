use anyhow::Result;
use chrono::Utc;
use custodian_core::runtime_dir;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Console events worth keeping in the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsoleRecord {
    CommandDispatched {
        command_id: String,
        verb: String,
    },
    CommandSettled {
        command_id: String,
        ok: bool,
        lines: usize,
    },
    LinkFailed {
        command_id: String,
        failures: u32,
        error: String,
    },
    OfflineChanged {
        offline: bool,
    },
    SnapshotRefreshed {
        time: u64,
        sectors: usize,
    },
    SnapshotFailed {
        error: String,
    },
    BootFallback {
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Observer {
    log_path: PathBuf,
    verbose: bool,
}

impl Observer {
    pub fn new(workspace: &Path) -> Result<Self> {
        let dir = runtime_dir(workspace);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            log_path: dir.join("observe.log"),
            verbose: false,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn record(&self, record: &ConsoleRecord) -> Result<()> {
        self.append_log_line(&format!(
            "{} EVENT {}",
            Utc::now().to_rfc3339(),
            serde_json::to_string(record)?
        ))
    }

    /// Enable or disable verbose logging to stderr.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Log to stderr with a `[custodian]` prefix when verbose mode is on.
    pub fn verbose_log(&self, msg: &str) {
        if self.verbose {
            eprintln!("[custodian] {msg}");
        }
        let _ = self.append_log_line(&format!("{} DEBUG {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn observer(tag: &str) -> Observer {
        let workspace =
            std::env::temp_dir().join(format!("custodian-observe-{tag}-{}", Uuid::now_v7()));
        fs::create_dir_all(&workspace).expect("create workspace");
        Observer::new(&workspace).expect("observer")
    }

    #[test]
    fn record_writes_tagged_event_line() {
        let observer = observer("record");
        observer
            .record(&ConsoleRecord::CommandDispatched {
                command_id: "abc".to_string(),
                verb: "STATUS".to_string(),
            })
            .expect("record");

        let log = fs::read_to_string(observer.log_path()).expect("read log");
        assert!(log.contains("EVENT"));
        assert!(log.contains(r#""kind":"command_dispatched""#));
        assert!(log.contains("STATUS"));
    }

    #[test]
    fn multiple_records_append() {
        let observer = observer("multi");
        observer
            .record(&ConsoleRecord::OfflineChanged { offline: true })
            .expect("record 1");
        observer
            .record(&ConsoleRecord::OfflineChanged { offline: false })
            .expect("record 2");

        let log = fs::read_to_string(observer.log_path()).expect("read log");
        assert_eq!(log.lines().filter(|l| l.contains("EVENT")).count(), 2);
    }

    #[test]
    fn verbose_mode_defaults_to_off_and_toggles() {
        let mut observer = observer("verbose");
        assert!(!observer.is_verbose());
        observer.set_verbose(true);
        assert!(observer.is_verbose());
        observer.set_verbose(false);
        assert!(!observer.is_verbose());
    }

    #[test]
    fn debug_lines_reach_log_file_when_quiet() {
        let observer = observer("debug");
        observer.verbose_log("snapshot skipped");

        let log = fs::read_to_string(observer.log_path()).expect("read log");
        assert!(log.contains("DEBUG snapshot skipped"));
    }
}
