//! Now-playing metadata normalisation.
//!
//! The upstream document is an untyped JSON object whose field names are not
//! consistent (`bitDepth` vs `bit_depth`, four spellings of the release year,
//! ...).  Everything downstream works on the canonical [`NowPlaying`] record
//! produced here, so fallback chains live in exactly one place.
//!
//! Presence follows the upstream producer's loose rules: a field only counts
//! when it is a non-empty string, a non-zero number, `true`, or a composite.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Upper bound on `prev_*_i` entries in a payload (i = 1..=5).
pub const MAX_RECENT_TRACKS: usize = 5;

const YEAR_KEYS: &[&str] = &["releaseDate", "year", "release_year", "release_date"];
const BIT_DEPTH_KEYS: &[&str] = &["bitDepth", "bit_depth"];
const SAMPLE_RATE_KEYS: &[&str] = &["sampleRate", "sample_rate"];
const STREAM_SAMPLE_RATE_KEYS: &[&str] = &["streamSampleRate", "stream_sample_rate"];
const STREAM_FORMAT_KEYS: &[&str] = &["streamFormat", "stream_format"];

/// A previously played track, taken from the `prev_*` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub artist: String,
    pub title: String,
    /// Empty when the payload carried no album for this slot.
    pub album: String,
}

/// Canonical now-playing record.  Every field is optional; defaults are
/// applied by the renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub bit_depth: Option<String>,
    pub sample_rate: Option<String>,
    pub format: Option<String>,
    pub stream_sample_rate: Option<String>,
    pub stream_format: Option<String>,
    pub recent: Vec<Track>,
}

impl NowPlaying {
    /// Normalise one upstream payload.  Non-object payloads yield an empty record.
    pub fn from_value(v: &Value) -> Self {
        Self {
            title: pick(v, &["title"]),
            artist: pick(v, &["artist"]),
            album: pick(v, &["album"]),
            year: pick(v, YEAR_KEYS),
            bit_depth: pick(v, BIT_DEPTH_KEYS),
            sample_rate: pick(v, SAMPLE_RATE_KEYS),
            format: pick(v, &["format"]),
            stream_sample_rate: pick(v, STREAM_SAMPLE_RATE_KEYS),
            stream_format: pick(v, STREAM_FORMAT_KEYS),
            recent: parse_previous_tracks(v),
        }
    }

    /// Record shown when a poll fails and `placeholder_on_error` is set.
    pub fn placeholder() -> Self {
        Self {
            title: Some("Test Song".to_string()),
            artist: Some("Test Artist".to_string()),
            album: Some("Test Album".to_string()),
            year: Some("2023".to_string()),
            bit_depth: Some("16".to_string()),
            sample_rate: Some("44100".to_string()),
            format: Some("FLAC".to_string()),
            stream_sample_rate: None,
            stream_format: None,
            recent: Vec::new(),
        }
    }

    pub fn song_id(&self) -> SongId {
        SongId::from_parts(self.artist.as_deref(), self.title.as_deref())
    }
}

/// Extract up to five previous tracks in slot order.  A slot is kept only
/// when both its artist and title are present.
pub fn parse_previous_tracks(v: &Value) -> Vec<Track> {
    (1..=MAX_RECENT_TRACKS)
        .filter_map(|i| {
            let artist = pick(v, &[format!("prev_artist_{i}").as_str()])?;
            let title = pick(v, &[format!("prev_title_{i}").as_str()])?;
            let album = pick(v, &[format!("prev_album_{i}").as_str()]).unwrap_or_default();
            Some(Track {
                artist,
                title,
                album,
            })
        })
        .collect()
}

/// Display-derived song key, used as the rating path segment.
///
/// Base64 of `"{artist}-{title}"` with everything but ASCII alphanumerics
/// stripped.  Not collision-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongId(String);

impl SongId {
    pub fn from_parts(artist: Option<&str>, title: Option<&str>) -> Self {
        let raw = format!(
            "{}-{}",
            artist.unwrap_or("Unknown"),
            title.unwrap_or("Unknown")
        );
        let encoded = STANDARD.encode(raw.as_bytes());
        Self(
            encoded
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SongId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cover art URL with a cache-busting timestamp.
pub fn cover_art_url(base: &str, timestamp_ms: i64) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}t={timestamp_ms}")
}

fn pick(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| v.get(*k).and_then(present_text))
}

fn present_text(v: &Value) -> Option<String> {
    match v {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            let f = n.as_f64()?;
            if f == 0.0 {
                None
            } else {
                Some(number_text(n, f))
            }
        }
        other => Some(other.to_string()),
    }
}

fn number_text(n: &Number, f: f64) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        // 48000.0 → "48000"
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
