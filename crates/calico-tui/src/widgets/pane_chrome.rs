//! PaneChrome: standardized bordered pane with an optional badge.

use crate::theme::{style_border, C_MUTED};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

/// A badge shown in the top-right of the pane header (e.g., "LIVE", "ERR").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Renders a bordered pane with a muted title and optional badge.
pub fn pane_chrome<'a>(title: &'a str, badge: Option<Badge<'a>>) -> Block<'a> {
    pane_chrome_borders(title, badge, Borders::ALL)
}

/// Like `pane_chrome` but with explicit border selection for stacked panes.
pub fn pane_chrome_borders<'a>(
    title: &'a str,
    badge: Option<Badge<'a>>,
    borders: Borders,
) -> Block<'a> {
    let block = Block::default()
        .borders(borders)
        .border_style(style_border())
        .title(Line::from(Span::styled(
            format!(" {} ", title),
            Style::default().fg(C_MUTED),
        )));

    if let Some(b) = badge {
        block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        )
    } else {
        block
    }
}
