//! Smooth Unicode volume bar.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// `width` cells filled to `fraction` (0.0..=1.0), eight steps per cell.
pub fn bar_string(fraction: f32, width: usize) -> String {
    let eighths = (fraction.clamp(0.0, 1.0) * width as f32 * 8.0).round() as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    let mut bar = String::with_capacity(width * 3);
    for _ in 0..full_blocks {
        bar.push('█');
    }
    if full_blocks < width {
        bar.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..width {
            bar.push(' ');
        }
    }
    bar
}

pub fn percent_label(volume: f32) -> String {
    format!("{:>3}%", (volume.clamp(0.0, 1.0) * 100.0).round() as u32)
}

/// Render `vol ▕████▍    ▏ 70%` into `area`.
pub fn draw_volume(frame: &mut Frame, area: Rect, volume: f32) {
    if area.width < 12 || area.height == 0 {
        return;
    }
    let label = percent_label(volume);
    let bar_w = (area.width as usize).saturating_sub(label.len() + 8).max(4);

    let spans = vec![
        Span::styled(" vol ", Style::default().fg(C_SECONDARY)),
        Span::styled("▕", Style::default().fg(C_MUTED)),
        Span::styled(bar_string(volume, bar_w), Style::default().fg(C_PLAYING)),
        Span::styled("▏", Style::default().fg(C_MUTED)),
        Span::styled(label, Style::default().fg(C_SECONDARY)),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_string() {
        assert_eq!(bar_string(0.0, 4), "    ");
        assert_eq!(bar_string(1.0, 4), "████");
        assert_eq!(bar_string(0.5, 4), "██  ");
        // 0.7 * 4 cells = 2.8 cells = 22.4 eighths, rounds to 22: two full, one 6/8.
        assert_eq!(bar_string(0.7, 4), "██▊ ");
        assert_eq!(bar_string(1.5, 2).chars().count(), 2);
    }

    #[test]
    fn test_percent_label() {
        assert_eq!(percent_label(0.7), " 70%");
        assert_eq!(percent_label(1.0), "100%");
        assert_eq!(percent_label(-0.2), "  0%");
    }
}
