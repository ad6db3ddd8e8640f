//! Header component: 2-row top bar.
//!
//! Row 1: station name, status text (coloured by class), time of last change.
//! Row 2: volume bar.
//!
//! Not focusable; draws to a 2-row area.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use calico_proto::state::SessionState;

use crate::{
    app_state::AppState,
    component::Component,
    theme::{status_color, style_muted, style_title},
    widgets::volume_bar::draw_volume,
};

pub struct Header;

impl Header {
    pub fn new() -> Self {
        Self
    }
}

impl Component for Header {
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height < 2 {
            frame.render_widget(Clear, area);
            frame.render_widget(Paragraph::new(build_row1(&state.session)), area);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        frame.render_widget(Clear, rows[0]);
        frame.render_widget(Paragraph::new(build_row1(&state.session)), rows[0]);
        draw_volume(frame, rows[1], state.session.volume);
    }

    fn min_height(&self) -> u16 {
        2
    }
}

fn build_row1(session: &SessionState) -> Line<'static> {
    let mut spans = vec![
        Span::raw(" "),
        Span::styled(session.station_name.clone(), style_title()),
        Span::raw("  "),
        Span::styled(
            session.status.text.clone(),
            Style::default()
                .fg(status_color(session.status.kind))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(at) = &session.status_at {
        spans.push(Span::styled(format!("  · {}", at), style_muted()));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::line_text;
    use calico_proto::protocol::{Status, StatusKind};

    #[test]
    fn test_row1() {
        let mut session = SessionState::new("Radio Calico".into(), 0.7);
        assert_eq!(
            line_text(&build_row1(&session)),
            " Radio Calico  Press play to start"
        );

        session.status = Status::new("Network error - retrying...", StatusKind::Error);
        session.status_at = Some("12:30:05".into());
        assert_eq!(
            line_text(&build_row1(&session)),
            " Radio Calico  Network error - retrying...  · 12:30:05"
        );
    }
}
