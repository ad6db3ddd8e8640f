//! RatingPane: thumbs counts with the listener's vote highlighted.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use calico_proto::rating::Vote;

use crate::{
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, C_PRIMARY, C_VOTE_DOWN, C_VOTE_UP},
    widgets::pane_chrome::pane_chrome,
};

pub struct RatingPane;

impl RatingPane {
    pub fn new() -> Self {
        Self
    }
}

impl Component for RatingPane {
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let block = pane_chrome("rating", None);
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);
        frame.render_widget(Paragraph::new(build_lines(state)), inner);
    }

    fn min_height(&self) -> u16 {
        4
    }
}

fn vote_span(glyph: &str, count: u64, color: Color, active: bool, enabled: bool) -> Span<'static> {
    let text = format!(" {} {} ", glyph, count);
    let style = if active {
        Style::default()
            .fg(color)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else if enabled {
        Style::default().fg(C_PRIMARY)
    } else {
        style_muted()
    };
    Span::styled(text, style)
}

fn build_lines(state: &AppState) -> Vec<Line<'static>> {
    let rating = &state.session.rating;
    let enabled = state.can_rate();
    vec![
        Line::from(vec![
            Span::raw(" "),
            vote_span(
                "👍",
                rating.thumbs_up,
                C_VOTE_UP,
                rating.active == Some(Vote::Up),
                enabled,
            ),
            Span::raw("  "),
            vote_span(
                "👎",
                rating.thumbs_down,
                C_VOTE_DOWN,
                rating.active == Some(Vote::Down),
                enabled,
            ),
        ]),
        Line::from(Span::styled(format!(" {}", rating.stats), style_secondary())),
    ]
}
