//! LogPanel component: collapsible tail of calico.log.
//!
//! Shows one line (most recent log) when collapsed; expands to a bordered
//! pane that always follows the newest entries.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    app_state::AppState,
    component::Component,
    theme::{C_MUTED, C_SECONDARY},
    widgets::pane_chrome::pane_chrome_borders,
};

pub const EXPANDED_HEIGHT: u16 = 10;

pub struct LogPanel {
    pub expanded: bool,
}

impl LogPanel {
    pub fn new() -> Self {
        Self { expanded: false }
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }
}

impl Component for LogPanel {
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);

        if !self.expanded || area.height <= 1 {
            let last = state
                .log_lines
                .last()
                .map(|s| compact_log_line(s))
                .unwrap_or_else(|| "(no log)".to_string());
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(" log ", Style::default().fg(C_MUTED)),
                    Span::styled(last, Style::default().fg(C_SECONDARY)),
                ])),
                area,
            );
            return;
        }

        let block = pane_chrome_borders("log", None, Borders::LEFT | Borders::TOP | Borders::RIGHT);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let height = inner.height as usize;
        let start = state.log_lines.len().saturating_sub(height);
        let lines: Vec<Line> = state.log_lines[start..]
            .iter()
            .map(|msg| {
                Line::from(vec![
                    Span::raw(" "),
                    Span::styled(compact_log_line(msg), Style::default().fg(C_MUTED)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn min_height(&self) -> u16 {
        if self.expanded {
            EXPANDED_HEIGHT
        } else {
            1
        }
    }
}

// ── Log line formatting ───────────────────────────────────────────────────────

/// `2026-10-18T09:15:02.120Z  INFO calico_tui::core: PlayerCore: ...`
/// becomes `09:15:02 INFO PlayerCore: ...` (or `10-18 09:15` on other days).
fn compact_log_line(raw: &str) -> String {
    let clean = raw.trim();
    let mut rest = clean;
    let mut head: Vec<String> = Vec::new();

    if let Some((tok, rem)) = split_first_token(rest) {
        if let Some(ts) = compact_timestamp(tok) {
            head.push(ts);
            rest = rem.trim_start();
        }
    }

    if let Some((tok, rem)) = split_first_token(rest) {
        let upper = tok.to_ascii_uppercase();
        if matches!(
            upper.as_str(),
            "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR"
        ) {
            head.push(upper);
            rest = rem.trim_start();
        }
    }

    // Module path prefix like "calico_tui::core: "
    if let Some((left, msg)) = rest.split_once(": ") {
        if !left.is_empty()
            && left.len() <= 48
            && left.contains("::")
            && left
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':'))
        {
            rest = msg.trim_start();
        }
    }

    if head.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        head.join(" ")
    } else {
        format!("{} {}", head.join(" "), rest)
    }
}

fn compact_timestamp(token: &str) -> Option<String> {
    let dt = chrono::DateTime::parse_from_rfc3339(token).ok()?;
    let local = dt.with_timezone(&chrono::Local);
    let fmt = if local.date_naive() == chrono::Local::now().date_naive() {
        "%H:%M:%S"
    } else {
        "%m-%d %H:%M"
    };
    Some(local.format(fmt).to_string())
}

fn split_first_token(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.splitn(2, char::is_whitespace);
    let first = parts.next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some((first, parts.next().unwrap_or("")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_tracing_line() {
        let out = compact_log_line(
            "2026-10-18T09:15:02.120431Z  INFO calico_tui::core: PlayerCore: starting event loop",
        );
        assert!(out.ends_with(" INFO PlayerCore: starting event loop"), "{out}");
    }

    #[test]
    fn test_compact_keeps_plain_text() {
        assert_eq!(compact_log_line("  plain message  "), "plain message");
        // A status-like prefix without a module path is kept.
        assert_eq!(
            compact_log_line("WARN ratings: submit rejected"),
            "WARN ratings: submit rejected"
        );
    }
}
