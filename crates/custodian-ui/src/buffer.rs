use crate::classify::is_assault_line;

/// Kinds of alert block that must sit between blank separator lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Assault,
    Warning,
}

fn block_kind(line: &str) -> Option<BlockKind> {
    if is_assault_line(line) {
        Some(BlockKind::Assault)
    } else if line.starts_with("[WARNING]") {
        Some(BlockKind::Warning)
    } else {
        None
    }
}

/// Insert blank separators so every alert block is isolated.
///
/// `last_line` is the line already at the end of the buffer, `None` when the
/// buffer is empty. A block gets a leading blank unless the line before it is
/// already blank or the buffer edge. The line after a block gets a blank
/// before it, and an explicit blank supplied by the caller counts as that
/// separator. A batch that ends inside a block is closed with a trailing blank.
pub fn normalize_assault_spacing(lines: &[String], last_line: Option<&str>) -> Vec<String> {
    let mut output: Vec<String> = Vec::with_capacity(lines.len() + 2);
    let mut current: Option<BlockKind> = None;

    for line in lines {
        let kind = block_kind(line);
        if let Some(kind) = kind
            && current != Some(kind)
        {
            let previous = output.last().map(String::as_str).or(last_line);
            if previous.is_some_and(|prev| !prev.is_empty()) {
                output.push(String::new());
            }
            current = Some(kind);
        }
        if kind.is_none() && current.is_some() {
            current = None;
            if line.is_empty() {
                if output.last().is_none_or(|prev| !prev.is_empty()) {
                    output.push(String::new());
                }
                continue;
            }
            if output.last().is_some_and(|prev| !prev.is_empty()) {
                output.push(String::new());
            }
        }
        output.push(line.clone());
    }

    if current.is_some() && output.last().is_some_and(|prev| !prev.is_empty()) {
        output.push(String::new());
    }
    output
}

/// Append-only output log. The live input line is held beside the committed
/// lines and never becomes one of them.
#[derive(Debug, Clone, Default)]
pub struct ScrollbackBuffer {
    lines: Vec<String>,
    live: Option<String>,
}

impl ScrollbackBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and append a batch. Returns the lines actually appended.
    pub fn append(&mut self, batch: &[String]) -> &[String] {
        let normalized = normalize_assault_spacing(batch, self.last_line());
        let start = self.lines.len();
        self.lines.extend(normalized);
        &self.lines[start..]
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Replace the committed lines with text written elsewhere, split on line breaks.
    pub fn replace_from_text(&mut self, text: &str) {
        self.lines = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(str::to_string).collect()
        };
    }

    pub fn set_live(&mut self, live: Option<String>) {
        self.live = live;
    }

    pub fn live(&self) -> Option<&str> {
        self.live.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Committed lines followed by the live line, if any.
    pub fn view(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(String::as_str)
            .chain(self.live.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn warning_after_text_gets_leading_separator_only() {
        let out = normalize_assault_spacing(&owned(&["[WARNING] HULL BREACH", ""]), Some("OK"));
        assert_eq!(out, owned(&["", "[WARNING] HULL BREACH", ""]));
    }

    #[test]
    fn assault_run_is_closed_before_following_text() {
        let out = normalize_assault_spacing(
            &owned(&["=== ASSAULT BEGINS ===", "[ASSAULT] wave 1", "DRONES LOST: 2"]),
            Some(""),
        );
        assert_eq!(
            out,
            owned(&["=== ASSAULT BEGINS ===", "[ASSAULT] wave 1", "", "DRONES LOST: 2"])
        );
    }

    #[test]
    fn batch_ending_in_assault_gets_trailing_separator() {
        let out = normalize_assault_spacing(&owned(&["A", "[ASSAULT] wave 3"]), None);
        assert_eq!(out, owned(&["A", "", "[ASSAULT] wave 3", ""]));
    }

    #[test]
    fn empty_buffer_needs_no_leading_separator() {
        let out = normalize_assault_spacing(&owned(&["[ASSAULT] wave 1"]), None);
        assert_eq!(out, owned(&["[ASSAULT] wave 1", ""]));
    }

    #[test]
    fn switching_block_kind_separates_the_blocks() {
        let out = normalize_assault_spacing(
            &owned(&["[WARNING] POWER LOW", "[ASSAULT] wave 1"]),
            Some(""),
        );
        assert_eq!(
            out,
            owned(&["[WARNING] POWER LOW", "", "[ASSAULT] wave 1", ""])
        );
    }

    #[test]
    fn plain_batches_pass_through() {
        let batch = owned(&["ALL SYSTEMS NOMINAL", "", "ARCHIVE      ."]);
        assert_eq!(normalize_assault_spacing(&batch, Some("x")), batch);
    }

    #[test]
    fn append_returns_normalized_tail() {
        let mut buffer = ScrollbackBuffer::new();
        buffer.append(&owned(&["> STATUS"]));
        let added = buffer.append(&owned(&["[ASSAULT] wave 1"])).to_vec();
        assert_eq!(added, owned(&["", "[ASSAULT] wave 1", ""]));
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn live_line_is_always_last_in_view_and_never_committed() {
        let mut buffer = ScrollbackBuffer::new();
        buffer.set_live(Some("> STA_".to_string()));
        buffer.append(&owned(&["LATE OUTPUT"]));
        let view: Vec<&str> = buffer.view().collect();
        assert_eq!(view, vec!["LATE OUTPUT", "> STA_"]);
        assert_eq!(buffer.lines(), owned(&["LATE OUTPUT"]).as_slice());
    }

    #[test]
    fn replace_from_text_splits_on_newlines() {
        let mut buffer = ScrollbackBuffer::new();
        buffer.replace_from_text("BOOT\n\nREADY");
        assert_eq!(buffer.lines(), owned(&["BOOT", "", "READY"]).as_slice());
        buffer.replace_from_text("");
        assert!(buffer.is_empty());
    }

    fn line_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("[ASSAULT] wave".to_string()),
            Just("=== ASSAULT BEGINS ===".to_string()),
            Just("[WARNING] BREACH".to_string()),
            Just("[EVENT] drones".to_string()),
            Just("ALL SYSTEMS NOMINAL".to_string()),
            Just("> STATUS".to_string()),
        ]
    }

    fn runs_are_isolated(lines: &[String], is_member: impl Fn(&str) -> bool) -> bool {
        for (idx, line) in lines.iter().enumerate() {
            if !is_member(line) {
                continue;
            }
            let starts_run = idx == 0 || !is_member(&lines[idx - 1]);
            if starts_run && idx > 0 && !lines[idx - 1].is_empty() {
                return false;
            }
            let ends_run = idx + 1 == lines.len() || !is_member(&lines[idx + 1]);
            if ends_run && idx + 1 < lines.len() && !lines[idx + 1].is_empty() {
                return false;
            }
        }
        true
    }

    proptest! {
        #[test]
        fn assault_runs_always_have_separators(
            batches in prop::collection::vec(prop::collection::vec(line_strategy(), 0..6), 0..6)
        ) {
            let mut buffer = ScrollbackBuffer::new();
            for batch in &batches {
                buffer.append(batch);
            }
            prop_assert!(runs_are_isolated(buffer.lines(), is_assault_line));
            prop_assert!(runs_are_isolated(buffer.lines(), |l| l.starts_with("[WARNING]")));
        }
    }
}
