//! Renderers: metadata record in, display values out.

use serde::{Deserialize, Serialize};

use crate::metadata::{cover_art_url, NowPlaying, Track, MAX_RECENT_TRACKS};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Year line.  Hiding it does not clear the last text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBanner {
    pub text: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingPanel {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: YearBanner,
    pub cover_url: Option<String>,
}

impl Default for NowPlayingPanel {
    fn default() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            year: YearBanner::default(),
            cover_url: None,
        }
    }
}

impl NowPlayingPanel {
    /// The cover URL is refreshed on every call, track change or not.
    pub fn render(&mut self, np: &NowPlaying, cover_base: &str, now_ms: i64) {
        self.title = np.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        self.artist = np
            .artist
            .clone()
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        self.album = np.album.clone().unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        match &np.year {
            Some(year) => {
                self.year.text = year.clone();
                self.year.visible = true;
            }
            None => self.year.visible = false,
        }

        self.cover_url = Some(cover_art_url(cover_base, now_ms));
    }
}

/// One row of the recently played list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentRow {
    pub artist: String,
    pub title: String,
}

/// Replace-all render of the history list, capped at five rows.
pub fn render_recent(tracks: &[Track]) -> Vec<RecentRow> {
    tracks
        .iter()
        .take(MAX_RECENT_TRACKS)
        .map(|t| RecentRow {
            artist: non_empty_or(&t.artist, UNKNOWN_ARTIST),
            title: non_empty_or(&t.title, UNKNOWN_TITLE),
        })
        .collect()
}

fn non_empty_or(s: &str, fallback: &str) -> String {
    if s.is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}
