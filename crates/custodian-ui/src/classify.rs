use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeatLevel {
    Compromised,
    Damaged,
    Alert,
    Activity,
    Stable,
}

impl HeatLevel {
    fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            'X' => Some(Self::Compromised),
            '!' => Some(Self::Damaged),
            '~' => Some(Self::Alert),
            '?' => Some(Self::Activity),
            '.' => Some(Self::Stable),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Compromised => 'X',
            Self::Damaged => '!',
            Self::Alert => '~',
            Self::Activity => '?',
            Self::Stable => '.',
        }
    }
}

/// Style tag derived from a line's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineTag {
    CommandEcho,
    Banner,
    Delta,
    Heat(HeatLevel),
    Event,
    Warning,
    Assault,
    Intent,
    Plain,
}

static HEAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9 _/-]*\s+([X!~?.])(\s\([+-]\))?$").unwrap());

fn has_delta(line: &str) -> bool {
    line.contains("(+)") || line.contains("(-)")
}

fn heat_level(line: &str) -> Option<HeatLevel> {
    let caps = HEAT_PATTERN.captures(line)?;
    let glyph = caps.get(1)?.as_str().chars().next()?;
    HeatLevel::from_glyph(glyph)
}

/// Classify one line. First matching rule wins.
pub fn classify(line: &str) -> LineTag {
    if line.starts_with("> ") {
        return LineTag::CommandEcho;
    }
    if line.starts_with("--- ") && line.ends_with(" ---") && line.len() >= 8 {
        return LineTag::Banner;
    }
    if has_delta(line) {
        return LineTag::Delta;
    }
    if let Some(level) = heat_level(line) {
        return LineTag::Heat(level);
    }
    if line.starts_with("[EVENT]") {
        return LineTag::Event;
    }
    if line.starts_with("[WARNING]") {
        return LineTag::Warning;
    }
    if is_assault_line(line) {
        return LineTag::Assault;
    }
    if line.starts_with("[FOCUS SET]") || line.starts_with("[HARDENING") {
        return LineTag::Intent;
    }
    LineTag::Plain
}

pub fn is_assault_line(line: &str) -> bool {
    line.starts_with("[ASSAULT]") || line.starts_with("=== ASSAULT")
}

/// Lines that should make the surface pulse when they arrive.
pub fn is_critical_line(line: &str) -> bool {
    line.contains("[WARNING]")
        || line.contains("[ASSAULT]")
        || line.contains("=== ASSAULT")
        || line.contains("COMPROMISED")
        || has_delta(line)
        || heat_level(line) == Some(HeatLevel::Compromised)
}
