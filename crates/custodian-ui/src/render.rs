use crate::buffer::ScrollbackBuffer;
use crate::classify::{LineTag, classify};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    pub tag: LineTag,
}

impl RenderedLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let tag = classify(&text);
        Self { text, tag }
    }
}

/// Classify every visible line, live line included. Tags are derived fresh on
/// each projection.
pub fn project(buffer: &ScrollbackBuffer) -> Vec<RenderedLine> {
    buffer.view().map(RenderedLine::new).collect()
}

/// Scroll position as reported by a surface, in rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub offset: usize,
    pub viewport: usize,
    pub content: usize,
}

impl ScrollMetrics {
    pub fn is_at_bottom(&self, threshold: usize) -> bool {
        self.offset + self.viewport >= self.content.saturating_sub(threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::HeatLevel;

    #[test]
    fn projection_tags_each_line_and_keeps_live_last() {
        let mut buffer = ScrollbackBuffer::new();
        buffer.append(&["COMMS        X".to_string(), "[EVENT] ping".to_string()]);
        buffer.set_live(Some("> WA_".to_string()));
        let lines = project(&buffer);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].tag, LineTag::Heat(HeatLevel::Compromised));
        assert_eq!(lines[1].tag, LineTag::Event);
        assert_eq!(lines[2].text, "> WA_");
        assert_eq!(lines[2].tag, LineTag::CommandEcho);
    }

    #[test]
    fn bottom_detection_uses_threshold() {
        let metrics = ScrollMetrics {
            offset: 80,
            viewport: 12,
            content: 100,
        };
        assert!(metrics.is_at_bottom(8));
        assert!(!metrics.is_at_bottom(7));
        assert!(ScrollMetrics::default().is_at_bottom(8));
        assert!(
            ScrollMetrics {
                offset: 0,
                viewport: 20,
                content: 5
            }
            .is_at_bottom(0)
        );
    }
}
