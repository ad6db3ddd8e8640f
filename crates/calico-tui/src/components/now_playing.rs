//! NowPlayingPane: title, artist, album, year badge, quality lines, cover URL.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use calico_proto::state::SessionState;

use crate::{
    app_state::AppState,
    component::Component,
    theme::{style_default, style_muted, style_secondary, style_title, C_TAG, C_YEAR},
    widgets::pane_chrome::{pane_chrome, Badge},
};

pub struct NowPlayingPane;

impl NowPlayingPane {
    pub fn new() -> Self {
        Self
    }
}

impl Component for NowPlayingPane {
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let panel = &state.session.now_playing;
        let badge = panel.year.visible.then(|| Badge {
            text: panel.year.text.as_str(),
            color: C_YEAR,
        });
        let block = pane_chrome("now playing", badge);
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new(build_lines(&state.session)).wrap(Wrap { trim: false }),
            inner,
        );
    }

    fn min_height(&self) -> u16 {
        9
    }
}

fn build_lines(session: &SessionState) -> Vec<Line<'static>> {
    let panel = &session.now_playing;
    let mut lines = vec![
        Line::from(Span::styled(format!(" {}", panel.title), style_title())),
        Line::from(Span::styled(format!(" {}", panel.artist), style_default())),
        Line::from(Span::styled(format!(" {}", panel.album), style_secondary())),
        Line::raw(""),
    ];

    for text in [&session.quality.source, &session.quality.stream] {
        if !text.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(" {}", text),
                Style::default().fg(C_TAG),
            )));
        }
    }

    if let Some(url) = &panel.cover_url {
        lines.push(Line::from(vec![
            Span::styled(" cover ", style_muted()),
            Span::styled(url.clone(), style_muted()),
        ]));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::line_text;
    use calico_proto::metadata::NowPlaying;
    use calico_proto::quality::QualityText;

    #[test]
    fn test_before_first_poll() {
        let session = SessionState::new("Radio".into(), 0.7);
        let text: Vec<String> = build_lines(&session).iter().map(line_text).collect();
        assert_eq!(
            text,
            vec![" Unknown Title", " Unknown Artist", " Unknown Album", ""]
        );
    }

    #[test]
    fn test_rendered_track() {
        let mut session = SessionState::new("Radio".into(), 0.7);
        let np = NowPlaying {
            title: Some("So What".into()),
            artist: Some("Miles Davis".into()),
            album: Some("Kind of Blue".into()),
            year: Some("1959".into()),
            bit_depth: Some("16".into()),
            sample_rate: Some("44100".into()),
            format: Some("FLAC".into()),
            ..Default::default()
        };
        session
            .now_playing
            .render(&np, "https://cdn.example/cover.jpg", 42);
        session.quality = QualityText::from_now_playing(&np);

        let text: Vec<String> = build_lines(&session).iter().map(line_text).collect();
        assert_eq!(text[0], " So What");
        assert_eq!(text[1], " Miles Davis");
        assert_eq!(text[4], " Source quality: 16-bit 44.1kHz FLAC");
        assert!(text[5].starts_with(" Stream quality: 44kHz FLAC"));
        assert_eq!(text[6], " cover https://cdn.example/cover.jpg?t=42");
    }
}
