/// Submitted commands, most recent last, with a browsing cursor in
/// `0..=entries.len()`. The past-the-end position means fresh input.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    pub fn record(&mut self, command: &str) {
        self.entries.push(command.to_uppercase());
        self.cursor = self.entries.len();
    }

    /// Step toward the oldest entry. `None` when already there.
    pub fn older(&mut self) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step toward fresh input. `None` when already there; stepping onto the
    /// past-the-end position yields an empty string.
    pub fn newer(&mut self) -> Option<String> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn current(&self) -> String {
        self.entries.get(self.cursor).cloned().unwrap_or_default()
    }
}
