use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rating::Vote;

pub const PLAY_GLYPH: &str = "▶️";
pub const PAUSE_GLYPH: &str = "⏸️";

/// Messages sent from the UI to the player core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// The single play/pause button.
    TogglePlay,
    Volume { value: f32 },
    Rate { vote: Vote },
    /// Fetch metadata once, outside the poll cadence.
    RefreshMetadata,
}

// ── Status reporter ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Idle,
    Connecting,
    Playing,
    Error,
}

impl StatusKind {
    pub fn class_suffix(self) -> &'static str {
        match self {
            StatusKind::Idle => "",
            StatusKind::Connecting => "connecting",
            StatusKind::Playing => "playing",
            StatusKind::Error => "error",
        }
    }
}

/// One text/class pair describing what the player is doing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub kind: StatusKind,
}

impl Status {
    pub fn new(text: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// `"status"`, `"status playing"`, ...
    pub fn class(&self) -> String {
        format!("status {}", self.kind.class_suffix())
            .trim_end()
            .to_string()
    }
}

pub const METADATA_UNAVAILABLE: &str = "Metadata unavailable";

impl Status {
    pub fn metadata_unavailable(detail: &str) -> Self {
        Status::new(format!("{METADATA_UNAVAILABLE} - {detail}"), StatusKind::Error)
    }

    pub fn is_metadata_error(&self) -> bool {
        self.text.starts_with(METADATA_UNAVAILABLE)
    }

    pub fn playing() -> Self {
        playing_status()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::new("Press play to start", StatusKind::Idle)
    }
}

// ── Stream errors ─────────────────────────────────────────────────────────────

/// Fatal stream error class, as reported by the streaming session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Manifest or segment could not be fetched; reload the stream.
    Network,
    /// Decoder or audio output trouble; recover in place.
    Media,
    /// Anything else tears the session down.
    Other,
}

impl StreamErrorKind {
    /// Classify an mpv `end-file` error string.
    pub fn classify(file_error: &str) -> Self {
        let e = file_error.to_ascii_lowercase();
        if e.contains("loading failed")
            || e.contains("network")
            || e.contains("http")
            || e.contains("timeout")
            || e.contains("connection")
        {
            StreamErrorKind::Network
        } else if e.contains("unrecognized file format")
            || e.contains("no audio")
            || e.contains("audio output")
            || e.contains("decod")
            || e.contains("demux")
        {
            StreamErrorKind::Media
        } else {
            StreamErrorKind::Other
        }
    }

    pub fn status(self) -> Status {
        match self {
            StreamErrorKind::Network => Status::new("Network error - retrying...", StatusKind::Error),
            StreamErrorKind::Media => Status::new("Media error - recovering...", StatusKind::Error),
            StreamErrorKind::Other => Status::new("Fatal error occurred", StatusKind::Error),
        }
    }
}

/// Lifecycle notices from the streaming session that only change the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    StartFile,
    FileLoaded,
    Playing,
    Paused,
    Ended,
}

impl StreamEvent {
    pub fn status(self) -> Status {
        match self {
            StreamEvent::StartFile => Status::new("Loading stream...", StatusKind::Connecting),
            StreamEvent::FileLoaded => Status::new("Stream loaded and ready", StatusKind::Connecting),
            StreamEvent::Playing => playing_status(),
            StreamEvent::Paused => Status::new("Stream paused", StatusKind::Idle),
            StreamEvent::Ended => Status::new("Stream ended", StatusKind::Idle),
        }
    }
}

// ── Playback state machine ────────────────────────────────────────────────────

/// Recovery attempts before a recoverable error tears the session down.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 5;

const RETRY_BASE: Duration = Duration::from_millis(500);
const RETRY_MAX: Duration = Duration::from_secs(8);

/// Wait before recovery attempt `attempt` (1-based): 0.5s, 1s, 2s, ... capped at 8s.
pub fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(5);
    (RETRY_BASE * factor).min(RETRY_MAX)
}

/// Playback controller state.
///
/// ```text
///   Stopped ──play──▶ Initializing ──ready──▶ Playing ──pause──▶ Paused
///      ▲                  │                    ▲   ◀──play──────┘
///      │                  └──play failed──▶ Paused
///      │
///   any live state ──fatal(network|media)──▶ Recovering ──ready──▶ Playing | Paused
///   any live state ──fatal(other)──────────▶ Failed ──play──▶ Initializing
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Initializing,
    Playing,
    Paused,
    /// Recoverable stream error.  `resume` is whether audio starts again once
    /// the stream is back; `attempt` counts recoveries since the last good state.
    Recovering {
        kind: StreamErrorKind,
        resume: bool,
        attempt: u32,
    },
    /// Session torn down; needs a fresh press of play.
    Failed,
}

/// Inputs the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// Play/pause button.
    Toggle,
    /// Stream session reports the manifest is loaded.
    StreamReady,
    /// The session could not start audio.
    PlaybackFailed,
    /// Fatal error reported by the session.
    Fatal(StreamErrorKind),
    /// A scheduled recovery attempt is due.
    RetryDue,
}

/// Side effects the core performs, in order, after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Create the streaming session if none exists and load the stream.
    InitSession,
    /// Destroy any existing session first, then create a fresh one.
    ReinitSession,
    StartAudio,
    PauseAudio,
    ResumeAudio,
    StartPoller,
    StopPoller,
    /// Feed `RetryDue` back after the delay.
    ScheduleRetry(Duration),
    ReloadStream,
    /// Reopen the audio output and reload the stream.
    RecoverMedia,
    DestroySession,
    Report(Status),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: PlaybackState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: PlaybackState, effects: Vec<Effect>) -> Option<Self> {
        Some(Self { next, effects })
    }
}

fn playing_status() -> Status {
    Status::new("Playing live stream", StatusKind::Playing)
}

fn teardown(status: Status) -> Option<Transition> {
    Transition::to(
        PlaybackState::Failed,
        vec![Effect::Report(status), Effect::StopPoller, Effect::DestroySession],
    )
}

impl PlaybackState {
    /// Next state plus effects, or `None` when `input` is not valid here
    /// (e.g. pressing play while the session is still initialising).
    pub fn step(self, input: PlayerInput) -> Option<Transition> {
        use Effect::*;
        use PlaybackState::*;
        use PlayerInput::*;

        match (self, input) {
            (Stopped, Toggle) => Transition::to(
                Initializing,
                vec![
                    Report(Status::new("Initializing stream...", StatusKind::Connecting)),
                    InitSession,
                ],
            ),
            (Failed, Toggle) => Transition::to(
                Initializing,
                vec![
                    Report(Status::new("Initializing stream...", StatusKind::Connecting)),
                    ReinitSession,
                ],
            ),
            (Initializing, StreamReady) => Transition::to(
                Playing,
                vec![StartAudio, StartPoller, Report(playing_status())],
            ),
            (Initializing | Playing | Paused | Recovering { .. }, PlaybackFailed) => {
                Transition::to(
                    Paused,
                    vec![
                        StopPoller,
                        Report(Status::new("Playback failed - try again", StatusKind::Error)),
                    ],
                )
            }
            (Playing, Toggle) => Transition::to(
                Paused,
                vec![PauseAudio, StopPoller, Report(StreamEvent::Paused.status())],
            ),
            (Paused, Toggle) => Transition::to(
                Playing,
                vec![ResumeAudio, StartPoller, Report(playing_status())],
            ),
            // Pressing the button mid-recovery gives up and stops.
            (Recovering { .. }, Toggle) => Transition::to(
                Stopped,
                vec![
                    StopPoller,
                    DestroySession,
                    Report(Status::new("Stream stopped", StatusKind::Idle)),
                ],
            ),
            (Recovering { resume: true, .. }, StreamReady) => Transition::to(
                Playing,
                vec![StartAudio, StartPoller, Report(playing_status())],
            ),
            (Recovering { resume: false, .. }, StreamReady) => Transition::to(
                Paused,
                vec![PauseAudio, Report(StreamEvent::Paused.status())],
            ),
            (Recovering { kind, .. }, RetryDue) => Transition::to(
                self,
                vec![match kind {
                    StreamErrorKind::Media => RecoverMedia,
                    _ => ReloadStream,
                }],
            ),
            (Stopped | Failed, Fatal(_)) => None,
            (_, Fatal(StreamErrorKind::Other)) => teardown(StreamErrorKind::Other.status()),
            (Recovering { attempt, .. }, Fatal(_)) if attempt >= MAX_RECOVERY_ATTEMPTS => {
                teardown(Status::new("Stream unavailable - press play to retry", StatusKind::Error))
            }
            (Recovering { resume, attempt, .. }, Fatal(kind)) => Transition::to(
                Recovering {
                    kind,
                    resume,
                    attempt: attempt + 1,
                },
                vec![Report(kind.status()), ScheduleRetry(retry_delay(attempt + 1))],
            ),
            (Initializing | Playing | Paused, Fatal(kind)) => Transition::to(
                Recovering {
                    kind,
                    resume: self != Paused,
                    attempt: 1,
                },
                vec![Report(kind.status()), ScheduleRetry(retry_delay(1))],
            ),
            _ => None,
        }
    }

    pub fn button_glyph(self) -> &'static str {
        match self {
            PlaybackState::Playing => PAUSE_GLYPH,
            _ => PLAY_GLYPH,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Initializing => "initializing",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Recovering { .. } => "recovering",
            PlaybackState::Failed => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(start: PlaybackState, inputs: &[PlayerInput]) -> PlaybackState {
        inputs.iter().fold(start, |s, i| {
            s.step(*i).map(|t| t.next).unwrap_or(s)
        })
    }

    #[test]
    fn test_press_play_from_stopped() {
        let t = PlaybackState::Stopped.step(PlayerInput::Toggle).unwrap();
        assert_eq!(t.next, PlaybackState::Initializing);
        assert!(t.effects.contains(&Effect::InitSession));
        assert_eq!(t.next.button_glyph(), PLAY_GLYPH);

        let t = t.next.step(PlayerInput::StreamReady).unwrap();
        assert_eq!(t.next, PlaybackState::Playing);
        assert_eq!(
            &t.effects[..2],
            &[Effect::StartAudio, Effect::StartPoller]
        );
        assert_eq!(t.next.button_glyph(), PAUSE_GLYPH);
    }

    #[test]
    fn test_double_initialize_is_rejected() {
        assert!(PlaybackState::Initializing.step(PlayerInput::Toggle).is_none());
    }

    #[test]
    fn test_pause_stops_poller_and_resume_does_not_reinit() {
        let t = PlaybackState::Playing.step(PlayerInput::Toggle).unwrap();
        assert_eq!(t.next, PlaybackState::Paused);
        assert!(t.effects.contains(&Effect::StopPoller));
        assert_eq!(t.next.button_glyph(), PLAY_GLYPH);

        let t = PlaybackState::Paused.step(PlayerInput::Toggle).unwrap();
        assert_eq!(t.next, PlaybackState::Playing);
        assert!(t.effects.contains(&Effect::ResumeAudio));
        assert!(!t.effects.contains(&Effect::InitSession));
    }

    fn recovering(kind: StreamErrorKind, resume: bool, attempt: u32) -> PlaybackState {
        PlaybackState::Recovering {
            kind,
            resume,
            attempt,
        }
    }

    #[test]
    fn test_fatal_errors_by_class() {
        let t = PlaybackState::Playing
            .step(PlayerInput::Fatal(StreamErrorKind::Network))
            .unwrap();
        assert_eq!(t.next, recovering(StreamErrorKind::Network, true, 1));
        assert_eq!(
            t.effects,
            vec![
                Effect::Report(StreamErrorKind::Network.status()),
                Effect::ScheduleRetry(Duration::from_millis(500)),
            ]
        );
        let t = t.next.step(PlayerInput::RetryDue).unwrap();
        assert_eq!(t.effects, vec![Effect::ReloadStream]);

        let t = PlaybackState::Playing
            .step(PlayerInput::Fatal(StreamErrorKind::Media))
            .unwrap();
        let t = t.next.step(PlayerInput::RetryDue).unwrap();
        assert_eq!(t.effects, vec![Effect::RecoverMedia]);

        let t = PlaybackState::Paused
            .step(PlayerInput::Fatal(StreamErrorKind::Other))
            .unwrap();
        assert_eq!(t.next, PlaybackState::Failed);
        assert!(t.effects.contains(&Effect::DestroySession));
    }

    #[test]
    fn test_recovery_restores_listener_intent() {
        // error while initialising, then the reload succeeds: audio must start
        let s = run(
            PlaybackState::Stopped,
            &[PlayerInput::Toggle, PlayerInput::Fatal(StreamErrorKind::Network)],
        );
        let t = s.step(PlayerInput::StreamReady).unwrap();
        assert_eq!(t.next, PlaybackState::Playing);
        assert_eq!(&t.effects[..2], &[Effect::StartAudio, Effect::StartPoller]);
        assert_eq!(t.next.button_glyph(), PAUSE_GLYPH);

        // error while paused: recovery stays paused
        let s = run(
            PlaybackState::Paused,
            &[PlayerInput::Fatal(StreamErrorKind::Network), PlayerInput::RetryDue],
        );
        let t = s.step(PlayerInput::StreamReady).unwrap();
        assert_eq!(t.next, PlaybackState::Paused);
        assert!(!t.effects.contains(&Effect::StartAudio));
        assert!(!t.effects.contains(&Effect::StartPoller));
        assert_eq!(t.next.button_glyph(), PLAY_GLYPH);
    }

    #[test]
    fn test_repeated_failures_back_off_then_give_up() {
        let mut s = PlaybackState::Playing;
        let mut delays = Vec::new();
        for _ in 0..MAX_RECOVERY_ATTEMPTS {
            let t = s.step(PlayerInput::Fatal(StreamErrorKind::Network)).unwrap();
            for e in &t.effects {
                if let Effect::ScheduleRetry(d) = e {
                    delays.push(d.as_millis());
                }
            }
            s = t.next;
            s = s.step(PlayerInput::RetryDue).unwrap().next;
        }
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000]);
        assert_eq!(s, recovering(StreamErrorKind::Network, true, MAX_RECOVERY_ATTEMPTS));

        let t = s.step(PlayerInput::Fatal(StreamErrorKind::Network)).unwrap();
        assert_eq!(t.next, PlaybackState::Failed);
        assert!(t.effects.contains(&Effect::DestroySession));
        assert!(!t.effects.contains(&Effect::ReloadStream));
    }

    #[test]
    fn test_recovery_and_fresh_press_after_teardown() {
        let s = run(
            PlaybackState::Stopped,
            &[
                PlayerInput::Toggle,
                PlayerInput::StreamReady,
                PlayerInput::Fatal(StreamErrorKind::Network),
                PlayerInput::RetryDue,
                PlayerInput::StreamReady,
            ],
        );
        assert_eq!(s, PlaybackState::Playing);

        let t = PlaybackState::Failed.step(PlayerInput::Toggle).unwrap();
        assert_eq!(t.next, PlaybackState::Initializing);
        assert!(t.effects.contains(&Effect::ReinitSession));
    }

    #[test]
    fn test_toggle_while_recovering_stops() {
        let t = recovering(StreamErrorKind::Network, true, 2)
            .step(PlayerInput::Toggle)
            .unwrap();
        assert_eq!(t.next, PlaybackState::Stopped);
        assert!(t.effects.contains(&Effect::DestroySession));
        // a retry timer that fires afterwards does nothing
        assert!(t.next.step(PlayerInput::RetryDue).is_none());
    }

    #[test]
    fn test_fatal_without_session_is_ignored() {
        assert!(PlaybackState::Stopped
            .step(PlayerInput::Fatal(StreamErrorKind::Network))
            .is_none());
        assert!(PlaybackState::Failed
            .step(PlayerInput::Fatal(StreamErrorKind::Media))
            .is_none());
    }

    #[test]
    fn test_playback_failed_leaves_session_paused() {
        let t = PlaybackState::Initializing
            .step(PlayerInput::PlaybackFailed)
            .unwrap();
        assert_eq!(t.next, PlaybackState::Paused);
        assert_eq!(
            t.effects,
            vec![
                Effect::StopPoller,
                Effect::Report(Status::new("Playback failed - try again", StatusKind::Error)),
            ]
        );
        assert_eq!(
            PlaybackState::Playing
                .step(PlayerInput::PlaybackFailed)
                .map(|t| t.next),
            Some(PlaybackState::Paused)
        );
    }

    #[test]
    fn test_classify_file_error() {
        assert_eq!(
            StreamErrorKind::classify("loading failed"),
            StreamErrorKind::Network
        );
        assert_eq!(
            StreamErrorKind::classify("unrecognized file format"),
            StreamErrorKind::Media
        );
        assert_eq!(
            StreamErrorKind::classify("audio output initialization failed"),
            StreamErrorKind::Media
        );
        assert_eq!(StreamErrorKind::classify("quit"), StreamErrorKind::Other);
    }

    #[test]
    fn test_metadata_unavailable() {
        let s = Status::metadata_unavailable("HTTP 500");
        assert_eq!(s.text, "Metadata unavailable - HTTP 500");
        assert!(s.is_metadata_error());
        assert!(!Status::playing().is_metadata_error());
    }

    #[test]
    fn test_status_class() {
        assert_eq!(Status::new("x", StatusKind::Playing).class(), "status playing");
        assert_eq!(Status::new("x", StatusKind::Idle).class(), "status");
    }

    #[test]
    fn test_stream_event_status() {
        assert_eq!(StreamEvent::StartFile.status().text, "Loading stream...");
        assert_eq!(StreamEvent::Ended.status().text, "Stream ended");
        assert_eq!(StreamEvent::Paused.status().class(), "status");
    }

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_string(&Command::Rate { vote: Vote::Up }).unwrap();
        assert_eq!(json, r#"{"cmd":"Rate","vote":1}"#);
    }
}
