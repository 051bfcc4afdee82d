use custodian_core::leading_verb;

pub const LINK_FAILED_LINES: [&str; 2] = ["COMMAND LINK FAILED.", "VERIFY SERVER AND RETRY."];
pub const SHORTCUT_HINT: &str = "TIP: TAB COMPLETES DIRECTIVES. UP/DOWN RECALLS HISTORY.";
pub const MAP_UPDATED: &str = "[MAP UPDATED]";
pub const COMMAND_MODE_LINES: [&str; 3] = ["", "--- COMMAND INTERFACE ACTIVE ---", "Awaiting directives."];
pub const HELP_VERB: &str = "HELP";

/// Consecutive command link failures and the offline flag they drive.
#[derive(Debug, Clone)]
pub struct LinkHealth {
    failures: u32,
    threshold: u32,
    offline: bool,
}

impl LinkHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: 0,
            threshold: threshold.max(1),
            offline: false,
        }
    }

    /// Returns true when this cleared a previously asserted offline flag.
    pub fn record_success(&mut self) -> bool {
        self.failures = 0;
        std::mem::replace(&mut self.offline, false)
    }

    /// Returns true when this failure asserted the offline flag.
    pub fn record_failure(&mut self) -> bool {
        self.failures = self.failures.saturating_add(1);
        if !self.offline && self.failures >= self.threshold {
            self.offline = true;
            return true;
        }
        false
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }
}

/// Decides whether a completed command warrants a snapshot refresh.
#[derive(Debug, Clone)]
pub struct RefreshGate {
    verbs: Vec<String>,
    notice_shown: bool,
}

impl RefreshGate {
    pub fn new(verbs: &[String]) -> Self {
        Self {
            verbs: verbs.iter().map(|v| v.trim().to_uppercase()).collect(),
            notice_shown: false,
        }
    }

    pub fn should_refresh(&self, raw: &str, ok: bool) -> bool {
        if !ok {
            return false;
        }
        let verb = leading_verb(raw);
        !verb.is_empty() && self.verbs.iter().any(|v| *v == verb)
    }

    /// The one-time notice for the first successful refresh of the session.
    pub fn take_notice(&mut self) -> Option<&'static str> {
        if self.notice_shown {
            return None;
        }
        self.notice_shown = true;
        Some(MAP_UPDATED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_core::DEFAULT_REFRESH_VERBS;

    fn gate() -> RefreshGate {
        let verbs: Vec<String> = DEFAULT_REFRESH_VERBS.iter().map(|s| s.to_string()).collect();
        RefreshGate::new(&verbs)
    }

    #[test]
    fn offline_asserts_on_third_failure_only() {
        let mut health = LinkHealth::new(3);
        assert!(!health.record_failure());
        assert!(!health.record_failure());
        assert!(health.record_failure());
        assert!(health.is_offline());
        assert!(!health.record_failure(), "already offline");
        assert_eq!(health.failures(), 4);
    }

    #[test]
    fn success_resets_counter_and_clears_offline() {
        let mut health = LinkHealth::new(3);
        health.record_failure();
        health.record_failure();
        assert!(!health.record_success());
        assert_eq!(health.failures(), 0);
        health.record_failure();
        health.record_failure();
        assert!(!health.is_offline());
        health.record_failure();
        assert!(health.record_success());
        assert!(!health.is_offline());
    }

    #[test]
    fn gate_checks_leading_verb_and_success() {
        let gate = gate();
        assert!(gate.should_refresh("status", true));
        assert!(gate.should_refresh("  move storage", true));
        assert!(!gate.should_refresh("move storage", false));
        assert!(!gate.should_refresh("help", true));
        assert!(!gate.should_refresh("", true));
        assert!(!gate.should_refresh("statusreport", true));
    }

    #[test]
    fn gate_uses_configured_verbs() {
        let gate = RefreshGate::new(&["wait".to_string()]);
        assert!(gate.should_refresh("WAIT 2", true));
        assert!(!gate.should_refresh("status", true));
    }

    #[test]
    fn map_notice_is_offered_once() {
        let mut gate = gate();
        assert_eq!(gate.take_notice(), Some(MAP_UPDATED));
        assert_eq!(gate.take_notice(), None);
    }
}
