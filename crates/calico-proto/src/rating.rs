//! Rating service wire types and the rating panel display logic.
//!
//! Counts are owned by the remote service; the client only reads them and
//! requests mutation.  The one thing computed locally is the total used for
//! the "N listeners rated this song" sentence.

use serde::{Deserialize, Serialize};

pub const RATING_FAILED: &str = "Rating failed";
pub const DEFAULT_STATS_TEXT: &str = "Be the first to rate this song";

/// A listener's vote.  Travels on the wire as the bare integer `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn value(self) -> i64 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

impl From<Vote> for i64 {
    fn from(v: Vote) -> Self {
        v.value()
    }
}

impl TryFrom<i64> for Vote {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Vote::Up),
            -1 => Ok(Vote::Down),
            other => Err(format!("rating must be 1 or -1, got {other}")),
        }
    }
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Body of `POST /api/ratings/{song_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub rating: Vote,
}

/// Response of both rating endpoints.  Missing or null counts read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingState {
    #[serde(default)]
    pub song_id: Option<String>,
    #[serde(default)]
    pub thumbs_up: Option<u64>,
    #[serde(default)]
    pub thumbs_down: Option<u64>,
    /// Raw value; anything other than `1` / `-1` means "no vote".
    #[serde(default)]
    pub user_rating: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RatingState {
    pub fn up(&self) -> u64 {
        self.thumbs_up.unwrap_or(0)
    }

    pub fn down(&self) -> u64 {
        self.thumbs_down.unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.up() + self.down()
    }

    pub fn user_vote(&self) -> Option<Vote> {
        self.user_rating.and_then(|v| Vote::try_from(v).ok())
    }
}

/// "1 listener rated this song" / "7 listeners rated this song".
/// `None` for zero so callers leave the current text alone.
pub fn stats_sentence(total: u64) -> Option<String> {
    match total {
        0 => None,
        1 => Some("1 listener rated this song".to_string()),
        n => Some(format!("{n} listeners rated this song")),
    }
}

/// Thumbs panel: counts, the highlighted button, and the stats line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingPanel {
    pub thumbs_up: u64,
    pub thumbs_down: u64,
    pub active: Option<Vote>,
    pub stats: String,
}

impl Default for RatingPanel {
    fn default() -> Self {
        Self {
            thumbs_up: 0,
            thumbs_down: 0,
            active: None,
            stats: DEFAULT_STATS_TEXT.to_string(),
        }
    }
}

impl RatingPanel {
    pub fn apply(&mut self, data: &RatingState) {
        self.thumbs_up = data.up();
        self.thumbs_down = data.down();
        self.active = data.user_vote();
        if let Some(sentence) = stats_sentence(data.total()) {
            self.stats = sentence;
        }
    }

    /// Result of a submit.  A failed submit keeps the displayed counts and
    /// only reports the failure.
    pub fn apply_submit(&mut self, success: bool, data: Option<&RatingState>) {
        match (success, data) {
            (true, Some(data)) => {
                self.apply(data);
                if let Some(msg) = data.message.as_deref().filter(|m| !m.is_empty()) {
                    self.stats = msg.to_string();
                }
            }
            (false, Some(data)) => {
                self.stats = data
                    .error
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(RATING_FAILED)
                    .to_string();
            }
            (_, None) => self.stats = RATING_FAILED.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_wire_format() {
        let body = serde_json::to_string(&RatingRequest { rating: Vote::Down }).unwrap();
        assert_eq!(body, r#"{"rating":-1}"#);
        let parsed: RatingRequest = serde_json::from_str(r#"{"rating":1}"#).unwrap();
        assert_eq!(parsed.rating, Vote::Up);
        assert!(serde_json::from_str::<RatingRequest>(r#"{"rating":2}"#).is_err());
    }

    #[test]
    fn test_stats_sentence_pluralises() {
        assert_eq!(stats_sentence(1).as_deref(), Some("1 listener rated this song"));
        assert_eq!(stats_sentence(7).as_deref(), Some("7 listeners rated this song"));
        assert_eq!(stats_sentence(0), None);
    }

    #[test]
    fn test_apply_highlights_user_vote() {
        let mut panel = RatingPanel::default();
        let data: RatingState = serde_json::from_str(
            r#"{"song_id":"abc","thumbs_up":3,"thumbs_down":1,"user_rating":-1}"#,
        )
        .unwrap();
        panel.apply(&data);
        assert_eq!(panel.thumbs_up, 3);
        assert_eq!(panel.thumbs_down, 1);
        assert_eq!(panel.active, Some(Vote::Down));
        assert_eq!(panel.stats, "4 listeners rated this song");
    }

    #[test]
    fn test_apply_zero_total_keeps_stats() {
        let mut panel = RatingPanel {
            stats: "previous".into(),
            ..RatingPanel::default()
        };
        let data: RatingState =
            serde_json::from_str(r#"{"thumbs_up":null,"thumbs_down":0,"user_rating":null}"#)
                .unwrap();
        panel.apply(&data);
        assert_eq!(panel.stats, "previous");
        assert_eq!(panel.active, None);
    }

    #[test]
    fn test_unknown_user_rating_highlights_nothing() {
        let data: RatingState = serde_json::from_str(r#"{"user_rating":0}"#).unwrap();
        assert_eq!(data.user_vote(), None);
    }

    #[test]
    fn test_apply_submit_shows_message() {
        let mut panel = RatingPanel::default();
        let data: RatingState = serde_json::from_str(
            r#"{"message":"Rating submitted successfully","thumbs_up":1,"thumbs_down":0,"user_rating":1}"#,
        )
        .unwrap();
        panel.apply_submit(true, Some(&data));
        assert_eq!(panel.stats, "Rating submitted successfully");
        assert_eq!(panel.active, Some(Vote::Up));
        assert_eq!(panel.thumbs_up, 1);
    }

    #[test]
    fn test_apply_submit_failure_keeps_counts() {
        let mut panel = RatingPanel {
            thumbs_up: 5,
            ..RatingPanel::default()
        };
        let data: RatingState =
            serde_json::from_str(r#"{"error":"Rating must be 1 (thumbs up) or -1 (thumbs down)"}"#)
                .unwrap();
        panel.apply_submit(false, Some(&data));
        assert_eq!(panel.thumbs_up, 5);
        assert_eq!(panel.stats, "Rating must be 1 (thumbs up) or -1 (thumbs down)");

        panel.apply_submit(false, None);
        assert_eq!(panel.stats, RATING_FAILED);
    }
}
