//! Status bar: bottom line with playback glyph and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use calico_proto::protocol::{PlaybackState, StatusKind};

use crate::theme::{status_color, C_MUTED, C_SEPARATOR};

/// Key hints; the rating keys are only listed while a song is known.
pub fn keys_hint(rate_enabled: bool) -> &'static str {
    if rate_enabled {
        " Space play/pause  ←→ vol  u/d rate  r refresh  L logs  K keys  q quit"
    } else {
        " Space play/pause  ←→ vol  r refresh  L logs  K keys  q quit"
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(
    frame: &mut Frame,
    area: Rect,
    playback: PlaybackState,
    status_kind: StatusKind,
    rate_enabled: bool,
) {
    let spans = vec![
        Span::styled(
            format!(" {} ", playback.button_glyph()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            playback.label().to_uppercase(),
            Style::default()
                .fg(status_color(status_kind))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(keys_hint(rate_enabled), Style::default().fg(C_MUTED)),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_hint() {
        assert!(keys_hint(true).contains("u/d rate"));
        assert!(!keys_hint(false).contains("rate"));
    }
}
