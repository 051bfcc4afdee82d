use crate::classify::{HeatLevel, LineTag};
use crate::map::SectorMap;
use crate::render::{RenderedLine, ScrollMetrics};
use crate::surface::{CommsState, HintView, Indicator, Surface};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

/// The map panel is only drawn when the terminal is at least this wide.
const MAP_MIN_WIDTH: u16 = 100;
const MAP_PANEL_WIDTH: u16 = 34;

pub fn style_for(tag: LineTag) -> Style {
    let base = Style::default();
    match tag {
        LineTag::CommandEcho => base.fg(Color::LightGreen).add_modifier(Modifier::BOLD),
        LineTag::Banner => base.fg(Color::Yellow).add_modifier(Modifier::BOLD),
        LineTag::Delta => base.fg(Color::Magenta),
        LineTag::Heat(HeatLevel::Compromised) => {
            base.fg(Color::Red).add_modifier(Modifier::BOLD)
        }
        LineTag::Heat(HeatLevel::Damaged) => base.fg(Color::LightRed),
        LineTag::Heat(HeatLevel::Alert) => base.fg(Color::Yellow),
        LineTag::Heat(HeatLevel::Activity) => base.fg(Color::LightYellow),
        LineTag::Heat(HeatLevel::Stable) => base.fg(Color::DarkGray),
        LineTag::Event => base.fg(Color::Cyan),
        LineTag::Warning => base.fg(Color::Yellow).add_modifier(Modifier::BOLD),
        LineTag::Assault => base.fg(Color::Red).add_modifier(Modifier::BOLD),
        LineTag::Intent => base.fg(Color::LightBlue),
        LineTag::Plain => base.fg(Color::Green),
    }
}

fn comms_color(comms: CommsState) -> Color {
    match comms {
        CommsState::Stable => Color::Green,
        CommsState::Alert => Color::Yellow,
        CommsState::Damaged => Color::LightRed,
        CommsState::Compromised => Color::Red,
    }
}

fn wrapped_text_rows(text: &str, width: u16) -> usize {
    if width == 0 {
        return 0;
    }
    let cols = text.width().max(1);
    (cols - 1) / width as usize + 1
}

/// Terminal rendering surface. Holds what the console last pushed and the
/// viewer's scroll position.
#[derive(Debug, Default)]
pub struct TuiSurface {
    lines: Vec<RenderedLine>,
    external: Vec<String>,
    follow_tail: bool,
    scroll: usize,
    viewport: usize,
    content: usize,
    unseen: bool,
    offline: bool,
    busy: bool,
    hint: Option<HintView>,
    flash: bool,
    comms: CommsState,
    input_area: Option<Rect>,
}

impl TuiSurface {
    pub fn new() -> Self {
        Self {
            follow_tail: true,
            ..Self::default()
        }
    }

    /// Boot output written straight to the surface before the console owns it.
    pub fn write_external(&mut self, line: &str) {
        self.external.push(line.to_string());
        self.follow_tail = true;
    }

    /// Hand back everything written externally, joined with newlines.
    pub fn take_external_text(&mut self) -> String {
        std::mem::take(&mut self.external).join("\n")
    }

    pub fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            offset: self.scroll,
            viewport: self.viewport,
            content: self.content,
        }
    }

    /// Move the view by `delta` rows (negative is up) and report the result.
    pub fn scroll_by(&mut self, delta: isize) -> ScrollMetrics {
        let max = self.content.saturating_sub(self.viewport);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
        self.follow_tail = self.scroll >= max;
        self.metrics()
    }

    pub fn page_rows(&self) -> isize {
        self.viewport.saturating_sub(1).max(1) as isize
    }

    pub fn hits_input(&self, column: u16, row: u16) -> bool {
        self.input_area
            .is_some_and(|area| area.contains(Position::new(column, row)))
    }

    pub fn draw(&mut self, frame: &mut Frame, map: &SectorMap) {
        let area = frame.area();
        if area.width < 10 || area.height < 5 {
            return;
        }
        let show_map = area.width >= MAP_MIN_WIDTH;
        let log_width = if show_map {
            area.width - MAP_PANEL_WIDTH
        } else {
            area.width
        };
        // Rows: log block, hint strip, status bar.
        let log_area = Rect::new(area.x, area.y, log_width, area.height - 2);
        let hint_area = Rect::new(area.x, log_area.bottom(), log_width, 1);
        let status_area = Rect::new(area.x, hint_area.bottom(), area.width, 1);

        self.draw_log(frame, log_area);
        // The live input line is the last log row; the hint strip sits two rows under it.
        let input_row = log_area.bottom().saturating_sub(2);
        self.input_area = Some(Rect::new(
            area.x,
            input_row,
            log_width,
            hint_area.bottom() - input_row,
        ));
        self.draw_hint(frame, hint_area);
        self.draw_status(frame, status_area);
        if show_map {
            let map_area = Rect::new(
                log_area.right(),
                area.y,
                MAP_PANEL_WIDTH,
                area.height - 1,
            );
            draw_map(frame, map_area, map);
        }
    }

    fn draw_log(&mut self, frame: &mut Frame, area: Rect) {
        let border = if self.flash {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(comms_color(self.comms))
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Span::styled(" CUSTODIAN ", border));
        let inner = block.inner(area);

        let text: Vec<Line> = if self.external.is_empty() {
            self.lines
                .iter()
                .map(|line| Line::from(Span::styled(line.text.clone(), style_for(line.tag))))
                .collect()
        } else {
            self.external
                .iter()
                .map(|line| {
                    let rendered = RenderedLine::new(line.as_str());
                    Line::from(Span::styled(rendered.text, style_for(rendered.tag)))
                })
                .collect()
        };

        self.viewport = inner.height as usize;
        self.content = text
            .iter()
            .map(|line| wrapped_text_rows(&line.to_string(), inner.width))
            .sum();
        let max = self.content.saturating_sub(self.viewport);
        self.scroll = if self.follow_tail {
            max
        } else {
            self.scroll.min(max)
        };

        let scroll = u16::try_from(self.scroll).unwrap_or(u16::MAX);
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0)),
            area,
        );
    }

    fn draw_hint(&self, frame: &mut Frame, area: Rect) {
        let Some(hint) = self.hint.as_ref() else {
            frame.render_widget(Paragraph::new(""), area);
            return;
        };
        let mut primary = Style::default().fg(Color::Green);
        if hint.faded {
            primary = primary.fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
        }
        let mut spans = vec![Span::styled(format!(" {}", hint.primary), primary)];
        if let Some(secondary) = hint.secondary {
            spans.push(Span::styled("  |  ", Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                secondary,
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let sep = Span::styled(" | ", Style::default().fg(Color::DarkGray));
        let link = if self.offline {
            Span::styled(
                "LINK OFFLINE",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("LINK OK", Style::default().fg(Color::Green))
        };
        let mut spans = vec![
            link,
            sep.clone(),
            Span::styled(
                format!("COMMS {}", self.comms.label()),
                Style::default().fg(comms_color(self.comms)),
            ),
        ];
        if self.busy {
            spans.push(sep.clone());
            spans.push(Span::styled(
                "AWAITING RESPONSE",
                Style::default().fg(Color::Yellow),
            ));
        }
        if self.unseen {
            spans.push(sep);
            spans.push(Span::styled(
                "NEW OUTPUT BELOW",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn draw_map(frame: &mut Frame, area: Rect, map: &SectorMap) {
    let comms = map.comms();
    let mut border = Style::default().fg(comms_color(comms));
    if map.is_failed() {
        border = border.add_modifier(Modifier::REVERSED);
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(" SECTOR MAP ", border));

    let mut lines: Vec<Line> = Vec::new();
    match map.meta_line() {
        Some(meta) => lines.push(Line::from(Span::styled(
            meta,
            Style::default().fg(Color::DarkGray),
        ))),
        None => lines.push(Line::from(Span::styled(
            "AWAITING TELEMETRY",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines.push(Line::from(""));
    for row in map.rows() {
        let mut style = Style::default().fg(comms_color(CommsState::from_status(&row.status)));
        if row.recent_hit {
            style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{:<13}", row.name), Style::default().fg(Color::Green)),
            Span::styled(row.shown, style),
        ]));
    }
    let panel = map.panel_lines();
    if !panel.is_empty() {
        lines.push(Line::from(""));
        lines.extend(
            panel
                .into_iter()
                .map(|line| Line::from(Span::styled(line, Style::default().fg(Color::Green)))),
        );
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

impl Surface for TuiSurface {
    fn paint(&mut self, lines: Vec<RenderedLine>, follow_tail: bool) {
        self.lines = lines;
        self.follow_tail = follow_tail;
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        match indicator {
            Indicator::UnseenOutput => self.unseen = on,
            Indicator::Offline => self.offline = on,
            Indicator::InputDisabled => self.busy = on,
        }
    }

    fn show_hint(&mut self, hint: Option<HintView>) {
        self.hint = hint;
    }

    fn set_flash(&mut self, on: bool) {
        self.flash = on;
    }

    fn set_comms(&mut self, comms: CommsState) {
        self.comms = comms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MapSink;
    use custodian_core::{SectorRecord, Snapshot};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn draws_log_hint_and_status() {
        let mut surface = TuiSurface::new();
        surface.paint(
            vec![
                RenderedLine::new("--- COMMAND INTERFACE ACTIVE ---"),
                RenderedLine::new("> STATUS_"),
            ],
            true,
        );
        surface.show_hint(Some(HintView {
            primary: "CLICK THE INPUT LINE TO FOCUS",
            secondary: None,
            faded: false,
        }));
        surface.set_indicator(Indicator::Offline, true);

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).expect("terminal");
        let map = SectorMap::default();
        terminal
            .draw(|frame| surface.draw(frame, &map))
            .expect("draw");
        let text = buffer_text(&terminal);
        assert!(text.contains("COMMAND INTERFACE ACTIVE"));
        assert!(text.contains("> STATUS_"));
        assert!(text.contains("CLICK THE INPUT LINE TO FOCUS"));
        assert!(text.contains("LINK OFFLINE"));
    }

    #[test]
    fn map_panel_appears_on_wide_terminals() {
        let mut surface = TuiSurface::new();
        let mut map = SectorMap::default();
        map.present(&Snapshot {
            time: 3,
            sectors: vec![SectorRecord {
                id: "CM".to_string(),
                name: "COMMS".to_string(),
                status: "ALERT".to_string(),
            }],
            ..Snapshot::default()
        });
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).expect("terminal");
        terminal
            .draw(|frame| surface.draw(frame, &map))
            .expect("draw");
        let text = buffer_text(&terminal);
        assert!(text.contains("SECTOR MAP"));
        assert!(text.contains("ALERT"));
        assert!(text.contains("TIME...... 3"));
    }

    #[test]
    fn scrolling_up_stops_following_and_bottom_resumes() {
        let mut surface = TuiSurface::new();
        let lines = (0..40)
            .map(|i| RenderedLine::new(format!("LINE {i}")))
            .collect();
        surface.paint(lines, true);
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).expect("terminal");
        let map = SectorMap::default();
        terminal
            .draw(|frame| surface.draw(frame, &map))
            .expect("draw");
        let bottom = surface.metrics();
        assert!(bottom.is_at_bottom(0));

        let up = surface.scroll_by(-20);
        assert_eq!(up.offset, bottom.offset - 20);
        assert!(!up.is_at_bottom(8));
        let down = surface.scroll_by(100);
        assert!(down.is_at_bottom(0));
    }

    #[test]
    fn external_text_is_drawn_then_handed_back() {
        let mut surface = TuiSurface::new();
        surface.write_external("[ SYSTEM POWER: UNSTABLE ]");
        surface.write_external("");
        surface.write_external("STATUS: DEGRADED");
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).expect("terminal");
        let map = SectorMap::default();
        terminal
            .draw(|frame| surface.draw(frame, &map))
            .expect("draw");
        assert!(buffer_text(&terminal).contains("STATUS: DEGRADED"));
        assert_eq!(
            surface.take_external_text(),
            "[ SYSTEM POWER: UNSTABLE ]\n\nSTATUS: DEGRADED"
        );
        assert_eq!(surface.take_external_text(), "");
    }

    #[test]
    fn input_hit_test_covers_last_log_row() {
        let mut surface = TuiSurface::new();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).expect("terminal");
        let map = SectorMap::default();
        assert!(!surface.hits_input(5, 9));
        terminal
            .draw(|frame| surface.draw(frame, &map))
            .expect("draw");
        // 12 rows: log block 0..=9 (inner 1..=8), hint row 10, status row 11.
        assert!(surface.hits_input(5, 8));
        assert!(surface.hits_input(5, 10));
        assert!(!surface.hits_input(5, 2));
        assert!(!surface.hits_input(5, 11));
    }

    #[test]
    fn wrapped_rows_count_display_width() {
        assert_eq!(wrapped_text_rows("", 10), 1);
        assert_eq!(wrapped_text_rows("0123456789", 10), 1);
        assert_eq!(wrapped_text_rows("0123456789A", 10), 2);
        assert_eq!(wrapped_text_rows("abc", 0), 0);
    }
}
