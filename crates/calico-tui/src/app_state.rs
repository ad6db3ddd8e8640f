//! AppState: read-only data handed to every component on draw.

use calico_proto::state::SessionState;

pub struct AppState {
    /// Latest snapshot from the StateManager.
    pub session: SessionState,
    /// Tail of calico.log, oldest first.
    pub log_lines: Vec<String>,
}

impl AppState {
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            log_lines: Vec::new(),
        }
    }

    /// Voting only makes sense once a song has been identified.
    pub fn can_rate(&self) -> bool {
        self.session.current_song_id.is_some()
    }
}
