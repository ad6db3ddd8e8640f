//! Color palette and style constants for the player TUI.

use calico_proto::protocol::StatusKind;
use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(18, 18, 18);
pub const C_PLAYING: Color = Color::Rgb(80, 200, 120);
pub const C_CONNECTING: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 80, 80);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SEPARATOR: Color = Color::Rgb(40, 40, 52);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_TAG: Color = Color::Rgb(80, 140, 200);
pub const C_YEAR: Color = Color::Rgb(255, 210, 50);
pub const C_VOTE_UP: Color = Color::Rgb(80, 200, 120);
pub const C_VOTE_DOWN: Color = Color::Rgb(255, 95, 95);

/// Status line colour for each status class.
pub fn status_color(kind: StatusKind) -> Color {
    match kind {
        StatusKind::Idle => C_SECONDARY,
        StatusKind::Connecting => C_CONNECTING,
        StatusKind::Playing => C_PLAYING,
        StatusKind::Error => C_ERROR,
    }
}

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_title() -> Style {
    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}
