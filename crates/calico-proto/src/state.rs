use crate::metadata::{NowPlaying, SongId};
use crate::protocol::{PlaybackState, Status};
use crate::quality::QualityText;
use crate::rating::{RatingPanel, RatingState};
use crate::view::{render_recent, NowPlayingPanel, RecentRow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything the front-end draws.  `rev` increases on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub rev: u64,
    pub station_name: String,
    pub playback: PlaybackState,
    pub status: Status,
    /// Local wall-clock time of the last status change, `HH:MM:SS`.
    pub status_at: Option<String>,
    pub volume: f32,
    pub now_playing: NowPlayingPanel,
    pub recent: Vec<RecentRow>,
    pub quality: QualityText,
    pub rating: RatingPanel,
    pub current_song_id: Option<SongId>,
}

impl SessionState {
    /// A stopped session with nothing rendered yet.
    pub fn new(station_name: String, volume: f32) -> Self {
        Self {
            rev: 1,
            station_name,
            playback: PlaybackState::Stopped,
            status: Status::default(),
            status_at: None,
            volume: volume.clamp(0.0, 1.0),
            now_playing: NowPlayingPanel::default(),
            recent: Vec::new(),
            quality: QualityText::default(),
            rating: RatingPanel::default(),
            current_song_id: None,
        }
    }

    pub fn button_glyph(&self) -> &'static str {
        self.playback.button_glyph()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistentState {
    pub volume: f32,
}

pub struct StateManager {
    state: Arc<RwLock<SessionState>>,
    state_file: PathBuf,
    cover_base: String,
}

impl StateManager {
    pub fn new(
        state_file: PathBuf,
        station_name: String,
        cover_base: String,
        default_volume: f32,
    ) -> Self {
        let volume = Self::load_persistent(&state_file)
            .map(|p| p.volume)
            .unwrap_or(default_volume);
        let state = SessionState::new(station_name, volume);

        Self {
            state: Arc::new(RwLock::new(state)),
            state_file,
            cover_base,
        }
    }

    pub async fn get_state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn current_song_id(&self) -> Option<SongId> {
        self.state.read().await.current_song_id.clone()
    }

    /// Run the now-playing, recent-tracks and quality renderers.  Returns the
    /// song id only when it differs from the one already shown.
    pub async fn render_metadata(&self, np: &NowPlaying, now_ms: i64) -> Option<SongId> {
        let mut state = self.state.write().await;
        state.now_playing.render(np, &self.cover_base, now_ms);
        state.recent = render_recent(&np.recent);
        state.quality = QualityText::from_now_playing(np);
        state.rev += 1;

        let id = np.song_id();
        if state.current_song_id.as_ref() == Some(&id) {
            return None;
        }
        state.current_song_id = Some(id.clone());
        Some(id)
    }

    /// Counts for a song that is no longer current are dropped.
    pub async fn apply_ratings(&self, song_id: &SongId, data: &RatingState) -> bool {
        let mut state = self.state.write().await;
        if state.current_song_id.as_ref() != Some(song_id) {
            return false;
        }
        state.rating.apply(data);
        state.rev += 1;
        true
    }

    /// Like `apply_ratings`, a submit result for a song no longer shown is dropped.
    pub async fn apply_rating_submit(
        &self,
        song_id: &SongId,
        success: bool,
        data: Option<&RatingState>,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.current_song_id.as_ref() != Some(song_id) {
            return false;
        }
        state.rating.apply_submit(success, data);
        state.rev += 1;
        true
    }

    pub async fn set_status(&self, status: Status) {
        let mut state = self.state.write().await;
        if state.status == status {
            return;
        }
        state.status = status;
        state.status_at = Some(chrono::Local::now().format("%H:%M:%S").to_string());
        state.rev += 1;
    }

    pub async fn set_playback(&self, playback: PlaybackState) {
        let mut state = self.state.write().await;
        state.playback = playback;
        state.rev += 1;
    }

    pub async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            state.volume = volume.clamp(0.0, 1.0);
            state.rev += 1;
        }
        self.save().await
    }

    async fn save(&self) -> anyhow::Result<()> {
        let persistent = PersistentState {
            volume: self.state.read().await.volume,
        };

        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&persistent)?;
        tokio::fs::write(&self.state_file, json).await?;
        Ok(())
    }

    fn load_persistent(state_file: &Path) -> Option<PersistentState> {
        let content = std::fs::read_to_string(state_file).ok()?;
        match serde_json::from_str(&content) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("ignoring unreadable state file {}: {}", state_file.display(), e);
                None
            }
        }
    }
}
