//! RecentPane: the last five tracks, newest first.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use calico_proto::view::RecentRow;

use unicode_width::UnicodeWidthStr;

use crate::{
    app_state::AppState,
    component::Component,
    theme::{style_default, style_muted, style_secondary},
    widgets::{pane_chrome::pane_chrome, text::truncate_to_width},
};

pub struct RecentPane;

impl RecentPane {
    pub fn new() -> Self {
        Self
    }
}

impl Component for RecentPane {
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let block = pane_chrome("recently played", None);
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new(build_lines(&state.session.recent, inner.width as usize)),
            inner,
        );
    }

    fn min_height(&self) -> u16 {
        7
    }
}

/// One row per track; titles are cut to fit `width` columns.
fn build_lines(rows: &[RecentRow], width: usize) -> Vec<Line<'static>> {
    if rows.is_empty() {
        return vec![Line::from(Span::styled(" nothing yet", style_muted()))];
    }
    rows.iter()
        .map(|row| {
            let room = width.saturating_sub(row.artist.width() + 3);
            Line::from(vec![
                Span::styled(format!(" {}:", row.artist), style_secondary()),
                Span::raw(" "),
                Span::styled(truncate_to_width(&row.title, room), style_default()),
            ])
        })
        .collect()
}
