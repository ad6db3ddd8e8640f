use calico_proto::metadata::NowPlaying;
use calico_proto::protocol::{Effect, PlaybackState, PlayerInput, PAUSE_GLYPH, PLAY_GLYPH};
use calico_proto::rating::{RatingState, Vote};
use calico_proto::state::StateManager;
use serde_json::json;

fn payload() -> serde_json::Value {
    json!({
        "title": "Blue in Green",
        "artist": "Miles Davis",
        "album": "Kind of Blue",
        "release_year": 1959,
        "bit_depth": 24,
        "sampleRate": "48000",
        "format": "FLAC",
        "prev_artist_1": "Bill Evans", "prev_title_1": "Peace Piece", "prev_album_1": "Everybody Digs",
        "prev_artist_2": "John Coltrane", "prev_title_2": "Naima",
        "prev_title_3": "Orphan Title",
    })
}

#[tokio::test]
async fn full_payload_renders_every_panel() {
    let dir = tempfile::tempdir().unwrap();
    let sm = StateManager::new(
        dir.path().join("state.json"),
        "Radio Calico".into(),
        "https://cdn.example/cover.jpg".into(),
        0.7,
    );

    let np = NowPlaying::from_value(&payload());
    let id = sm.render_metadata(&np, 1_700_000_000_000).await.unwrap();

    let state = sm.get_state().await;
    assert_eq!(state.now_playing.title, "Blue in Green");
    assert_eq!(state.now_playing.year.text, "1959");
    assert!(state.now_playing.year.visible);
    assert_eq!(
        state.now_playing.cover_url.as_deref(),
        Some("https://cdn.example/cover.jpg?t=1700000000000")
    );
    assert_eq!(state.recent.len(), 2);
    assert_eq!(state.recent[1].title, "Naima");
    assert_eq!(state.quality.source, "Source quality: 24-bit 48.0kHz FLAC");
    assert_eq!(state.quality.stream, "Stream quality: 48kHz FLAC / HLS Lossless");

    let ratings: RatingState =
        serde_json::from_value(json!({ "thumbs_up": 1, "thumbs_down": 0, "user_rating": 1 }))
            .unwrap();
    assert!(sm.apply_ratings(&id, &ratings).await);
    let state = sm.get_state().await;
    assert_eq!(state.rating.active, Some(Vote::Up));
    assert_eq!(state.rating.stats, "1 listener rated this song");
}

#[test]
fn play_pause_cycle_drives_poller_and_glyph() {
    let mut state = PlaybackState::Stopped;
    let mut poller_running = false;
    let mut glyphs = vec![state.button_glyph()];

    for input in [PlayerInput::Toggle, PlayerInput::StreamReady, PlayerInput::Toggle] {
        let t = state.step(input).expect("valid transition");
        for effect in &t.effects {
            match effect {
                Effect::StartPoller => poller_running = true,
                Effect::StopPoller => poller_running = false,
                _ => {}
            }
        }
        state = t.next;
        glyphs.push(state.button_glyph());
        if state == PlaybackState::Playing {
            assert!(poller_running);
        }
    }

    assert_eq!(glyphs, vec![PLAY_GLYPH, PLAY_GLYPH, PAUSE_GLYPH, PLAY_GLYPH]);
    assert!(!poller_running);
}
