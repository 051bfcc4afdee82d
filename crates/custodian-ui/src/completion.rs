#[derive(Debug, Clone)]
struct CycleState {
    seed: String,
    matches: Vec<String>,
    index: Option<usize>,
    applied: Option<String>,
}

/// Tab completion over a fixed vocabulary of directive tokens.
#[derive(Debug, Clone)]
pub struct Completion {
    vocabulary: Vec<String>,
    state: Option<CycleState>,
}

impl Completion {
    pub fn new(vocabulary: &[String]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|t| t.to_uppercase()).collect(),
            state: None,
        }
    }

    /// Advance through tokens matching the current input and return the
    /// replacement input (`token + " "`). `None` when nothing matches.
    pub fn cycle(&mut self, input: &str, reverse: bool) -> Option<String> {
        let continuing = self
            .state
            .as_ref()
            .and_then(|s| s.applied.as_deref())
            .is_some_and(|applied| applied == input);
        if !continuing {
            let seed = input.trim().to_uppercase();
            if self.state.as_ref().is_none_or(|s| s.seed != seed) {
                let matches = self
                    .vocabulary
                    .iter()
                    .filter(|token| token.starts_with(&seed))
                    .cloned()
                    .collect();
                self.state = Some(CycleState {
                    seed,
                    matches,
                    index: None,
                    applied: None,
                });
            }
        }

        let state = self.state.as_mut()?;
        let len = state.matches.len();
        if len == 0 {
            return None;
        }
        let next = match (state.index, reverse) {
            (None, false) => 0,
            (None, true) => len - 1,
            (Some(i), false) => (i + 1) % len,
            (Some(i), true) => (i + len - 1) % len,
        };
        state.index = Some(next);
        let replacement = format!("{} ", state.matches[next]);
        state.applied = Some(replacement.clone());
        Some(replacement)
    }

    /// Drop the cached match set after a manual edit.
    pub fn invalidate(&mut self) {
        self.state = None;
    }

    pub fn matches(&self) -> &[String] {
        self.state.as_ref().map(|s| s.matches.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Completion {
        let vocab: Vec<String> = ["STATUS", "SCAN", "SCAVENGE", "SET", "WAIT"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Completion::new(&vocab)
    }

    #[test]
    fn cycles_every_match_once_then_wraps() {
        let mut completion = engine();
        let mut input = "sc".to_string();
        let mut seen = Vec::new();
        for _ in 0..3 {
            input = completion.cycle(&input, false).expect("match");
            seen.push(input.clone());
        }
        assert_eq!(seen, vec!["SCAN ", "SCAVENGE ", "SCAN "]);
    }

    #[test]
    fn reverse_starts_from_last_match() {
        let mut completion = engine();
        let first = completion.cycle("S", true).expect("match");
        assert_eq!(first, "SET ");
        let second = completion.cycle(&first, true).expect("match");
        assert_eq!(second, "SCAVENGE ");
        let third = completion.cycle(&second, false).expect("match");
        assert_eq!(third, "SET ");
    }

    #[test]
    fn new_prefix_resets_cycle() {
        let mut completion = engine();
        let applied = completion.cycle("s", false).expect("match");
        assert_eq!(applied, "STATUS ");
        let next = completion.cycle("w", false).expect("match");
        assert_eq!(next, "WAIT ");
        assert_eq!(completion.matches(), ["WAIT"]);
    }

    #[test]
    fn invalidate_restarts_from_first_match() {
        let mut completion = engine();
        let applied = completion.cycle("sc", false).expect("match");
        let _ = completion.cycle(&applied, false);
        completion.invalidate();
        assert_eq!(completion.cycle("sc", false).as_deref(), Some("SCAN "));
    }

    #[test]
    fn no_match_leaves_input_alone() {
        let mut completion = engine();
        assert_eq!(completion.cycle("zz", false), None);
        assert!(completion.matches().is_empty());
    }

    #[test]
    fn empty_input_cycles_whole_vocabulary() {
        let mut completion = engine();
        let mut input = String::new();
        let mut seen = Vec::new();
        for _ in 0..5 {
            input = completion.cycle(&input, false).expect("match");
            seen.push(input.trim().to_string());
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }
}
