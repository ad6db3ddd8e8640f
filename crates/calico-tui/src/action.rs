//! Action enum: user intents from the keyboard.

use calico_proto::protocol::Command;
use calico_proto::rating::Vote;
use calico_proto::state::SessionState;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub const VOLUME_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    TogglePlay,
    /// Signed change applied to the current volume.
    VolumeStep(f32),

    // ── Ratings / metadata ───────────────────────────────────────────────────
    Rate(Vote),
    RefreshMetadata,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleLogs,
    ToggleKeys,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Quit);
        }
        let action = match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => Action::TogglePlay,
            KeyCode::Right | KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('=') => {
                Action::VolumeStep(VOLUME_STEP)
            }
            KeyCode::Left | KeyCode::Down | KeyCode::Char('-') => {
                Action::VolumeStep(-VOLUME_STEP)
            }
            KeyCode::Char('u') => Action::Rate(Vote::Up),
            KeyCode::Char('d') => Action::Rate(Vote::Down),
            KeyCode::Char('r') => Action::RefreshMetadata,
            KeyCode::Char('L') => Action::ToggleLogs,
            KeyCode::Char('K') => Action::ToggleKeys,
            KeyCode::Char('q') => Action::Quit,
            _ => return None,
        };
        Some(action)
    }

    /// The command this action sends to the core, if any.  Votes need a
    /// current song; volume steps at either end of the range are dropped.
    pub fn to_command(self, state: &SessionState) -> Option<Command> {
        match self {
            Action::TogglePlay => Some(Command::TogglePlay),
            Action::VolumeStep(delta) => {
                let value = (state.volume + delta).clamp(0.0, 1.0);
                ((value - state.volume).abs() > f32::EPSILON).then_some(Command::Volume { value })
            }
            Action::Rate(vote) => state
                .current_song_id
                .is_some()
                .then_some(Command::Rate { vote }),
            Action::RefreshMetadata => Some(Command::RefreshMetadata),
            Action::ToggleLogs | Action::ToggleKeys | Action::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calico_proto::metadata::SongId;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Action::from_key(key(KeyCode::Char(' '))), Some(Action::TogglePlay));
        assert_eq!(
            Action::from_key(key(KeyCode::Char('+'))),
            Some(Action::VolumeStep(VOLUME_STEP))
        );
        assert_eq!(
            Action::from_key(key(KeyCode::Left)),
            Some(Action::VolumeStep(-VOLUME_STEP))
        );
        assert_eq!(Action::from_key(key(KeyCode::Char('u'))), Some(Action::Rate(Vote::Up)));
        assert_eq!(Action::from_key(key(KeyCode::Char('d'))), Some(Action::Rate(Vote::Down)));
        assert_eq!(Action::from_key(key(KeyCode::Char('x'))), None);
        assert_eq!(
            Action::from_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_volume_clamped() {
        let mut state = SessionState::new("Radio".into(), 0.98);
        match Action::VolumeStep(VOLUME_STEP).to_command(&state) {
            Some(Command::Volume { value }) => assert!((value - 1.0).abs() < 1e-6),
            other => panic!("unexpected {:?}", other),
        }

        state.volume = 1.0;
        assert!(Action::VolumeStep(VOLUME_STEP).to_command(&state).is_none());
        state.volume = 0.0;
        assert!(Action::VolumeStep(-VOLUME_STEP).to_command(&state).is_none());
    }

    #[test]
    fn test_rate_needs_current_song() {
        let mut state = SessionState::new("Radio".into(), 0.7);
        assert!(Action::Rate(Vote::Up).to_command(&state).is_none());

        state.current_song_id = Some(SongId::from_parts(Some("Miles Davis"), Some("So What")));
        assert!(matches!(
            Action::Rate(Vote::Down).to_command(&state),
            Some(Command::Rate { vote: Vote::Down })
        ));
    }

    #[test]
    fn test_ui_toggles_send_nothing() {
        let state = SessionState::new("Radio".into(), 0.7);
        assert!(Action::ToggleLogs.to_command(&state).is_none());
        assert!(Action::Quit.to_command(&state).is_none());
    }
}
