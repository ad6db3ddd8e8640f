//! Component trait: the interface every UI panel implements.
//!
//! Panels are draw-only: keys are mapped to actions by the App, and the
//! data they show arrives through `AppState`.

use ratatui::{layout::Rect, Frame};

use crate::app_state::AppState;

pub trait Component {
    /// Render the component into `area`.
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState);

    /// The minimum height required to render meaningfully.
    fn min_height(&self) -> u16 {
        3
    }
}

/// Flatten a line to its text, for assertions.
#[cfg(test)]
pub fn line_text(line: &ratatui::text::Line) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}
