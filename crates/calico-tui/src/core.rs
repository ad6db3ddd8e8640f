/// PlayerCore: single-owner event loop for the playback controller.
///
/// Owns the mpv driver, the metadata poller and the rating client.  Every
/// input (UI commands, mpv events, poll results, rating results, heartbeat)
/// arrives as a `CoreEvent` on one mpsc channel.  Playback inputs are run
/// through `PlaybackState::step`; the returned effects are executed here in
/// order.  After each change a `BroadcastMessage::StateUpdated` goes out.
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use calico_proto::config::Config;
use calico_proto::metadata::{cover_art_url, NowPlaying, SongId};
use calico_proto::protocol::{
    Command, Effect, PlaybackState, PlayerInput, Status, StatusKind, StreamErrorKind,
    StreamEvent,
};
use calico_proto::rating::RatingState;
use calico_proto::state::StateManager;
use reqwest::Client;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::proxied_url;
use crate::error::FetchError;
use crate::mpv::{MpvDriver, MpvEvent, MpvHandle, OBS_CORE_IDLE, OBS_PAUSE};
use crate::poller::{MetadataFetcher, PollOutcome, PollerHandle};
use crate::ratings::{RatingClient, SubmitOutcome};
use crate::BroadcastMessage;

const HEARTBEAT: Duration = Duration::from_secs(10);

// ── CoreEvent ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CoreEvent {
    Command(Command),
    Mpv(MpvEvent),
    Metadata(PollOutcome),
    RatingsLoaded {
        song_id: SongId,
        result: Result<Option<RatingState>, FetchError>,
    },
    RatingSubmitted {
        song_id: SongId,
        outcome: SubmitOutcome,
    },
    /// Apply a volume change held back by the throttle.
    FlushVolume,
    /// A scheduled stream recovery attempt is due.
    RetryDue,
    HeartbeatTick,
    Shutdown,
}

// ── PlayerCore ────────────────────────────────────────────────────────────────

pub struct PlayerCore {
    config: Config,
    state_manager: Arc<StateManager>,
    client: Client,
    mpv_driver: MpvDriver,
    mpv_handle: Option<MpvHandle>,
    poller: PollerHandle,
    ratings: RatingClient,
    event_tx: mpsc::Sender<CoreEvent>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    playback: PlaybackState,
    volume_throttle: Duration,
    last_volume_apply: Option<Instant>,
    pending_volume: Option<f32>,
}

impl PlayerCore {
    pub fn new(
        config: Config,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<CoreEvent>,
    ) -> anyhow::Result<Self> {
        let state_manager = Arc::new(StateManager::new(
            config.daemon.state_file.clone(),
            config.station.name.clone(),
            config.station.cover_url.clone(),
            config.player.default_volume,
        ));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.polling.request_timeout_secs))
            .build()?;
        let proxy_base = config.cache_proxy_base();

        let metadata_url = proxied_url(proxy_base.as_deref(), &config.station.metadata_url);
        let fetcher = MetadataFetcher::from_config(client.clone(), metadata_url, &config.polling);
        let (poll_tx, mut poll_rx) = mpsc::channel::<PollOutcome>(16);
        let poller = PollerHandle::new(
            fetcher,
            Duration::from_secs(config.polling.interval_secs),
            poll_tx,
        );
        let forward_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(outcome) = poll_rx.recv().await {
                if forward_tx.send(CoreEvent::Metadata(outcome)).await.is_err() {
                    break;
                }
            }
        });

        let ratings = RatingClient::new(client.clone(), &config.ratings, proxy_base);

        Ok(Self {
            volume_throttle: Duration::from_millis(config.player.volume_throttle_ms),
            config,
            state_manager,
            client,
            mpv_driver: MpvDriver::new(0.0),
            mpv_handle: None,
            poller,
            ratings,
            event_tx,
            broadcast_tx,
            playback: PlaybackState::Stopped,
            last_volume_apply: None,
            pending_volume: None,
        })
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state_manager)
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");
        self.mpv_driver.last_volume = self.state_manager.get_state().await.volume;
        // fill now-playing, quality and ratings before the first press of play
        self.poller.fetch_once();

        let heartbeat_tx = self.event_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(HEARTBEAT).await;
                if heartbeat_tx.send(CoreEvent::HeartbeatTick).await.is_err() {
                    break;
                }
            }
        });

        while let Some(evt) = event_rx.recv().await {
            if matches!(evt, CoreEvent::Shutdown) {
                info!("PlayerCore: shutdown requested");
                break;
            }
            self.handle_event(evt).await;
        }

        self.cleanup().await;
        Ok(())
    }

    async fn handle_event(&mut self, evt: CoreEvent) {
        match evt {
            CoreEvent::Command(cmd) => {
                info!("PlayerCore: command {:?}", cmd);
                self.handle_command(cmd).await;
            }
            CoreEvent::Mpv(evt) => self.handle_mpv_event(evt).await,
            CoreEvent::Metadata(outcome) => self.handle_metadata(outcome).await,
            CoreEvent::RatingsLoaded { song_id, result } => match result {
                Ok(Some(data)) => {
                    if self.state_manager.apply_ratings(&song_id, &data).await {
                        self.notify();
                    }
                }
                Ok(None) => debug!("ratings: load for {} collapsed", song_id),
                Err(e) => warn!("ratings: failed to load ratings for {}: {}", song_id, e),
            },
            CoreEvent::RatingSubmitted { song_id, outcome } => match outcome {
                SubmitOutcome::Completed { success, data } => {
                    if !success {
                        warn!("ratings: submit rejected");
                    }
                    if self
                        .state_manager
                        .apply_rating_submit(&song_id, success, data.as_ref())
                        .await
                    {
                        self.notify();
                    } else {
                        debug!("ratings: submit result for {} is stale", song_id);
                    }
                }
                other => debug!("ratings: submit {:?}", other),
            },
            CoreEvent::FlushVolume => {
                if let Some(v) = self.pending_volume.take() {
                    self.apply_volume(v).await;
                }
            }
            CoreEvent::RetryDue => self.dispatch(PlayerInput::RetryDue).await,
            CoreEvent::HeartbeatTick => {
                if self.mpv_handle.is_some() && self.mpv_driver.process_exited() {
                    warn!("PlayerCore: heartbeat: mpv process died");
                    self.mpv_handle = None;
                    self.dispatch(PlayerInput::Fatal(StreamErrorKind::Other)).await;
                }
            }
            CoreEvent::Shutdown => {}
        }
    }

    fn notify(&self) {
        let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
    }

    async fn report(&self, status: Status) {
        self.state_manager.set_status(status).await;
        self.notify();
    }

    // ── commands ──────────────────────────────────────────────────────────────

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::TogglePlay => self.dispatch(PlayerInput::Toggle).await,
            Command::Volume { value } => self.set_volume(value).await,
            Command::Rate { vote } => {
                let Some(song_id) = self.state_manager.current_song_id().await else {
                    debug!("ratings: no current song, ignoring vote");
                    return;
                };
                let ratings = self.ratings.clone();
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let outcome = ratings.submit(&song_id, vote).await;
                    let _ = tx.send(CoreEvent::RatingSubmitted { song_id, outcome }).await;
                });
            }
            Command::RefreshMetadata => self.poller.fetch_once(),
        }
    }

    /// Volume is applied at any time.  Changes inside the throttle window are
    /// coalesced and the last one is applied when the window ends.
    async fn set_volume(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if let Err(e) = self.state_manager.set_volume(value).await {
            warn!("PlayerCore: failed to persist volume: {}", e);
        }
        self.notify();

        let elapsed = self.last_volume_apply.map(|t| t.elapsed());
        match elapsed {
            Some(e) if e < self.volume_throttle => {
                let already_scheduled = self.pending_volume.replace(value).is_some();
                if !already_scheduled {
                    let tx = self.event_tx.clone();
                    let wait = self.volume_throttle - e;
                    tokio::spawn(async move {
                        tokio::time::sleep(wait).await;
                        let _ = tx.send(CoreEvent::FlushVolume).await;
                    });
                }
            }
            _ => self.apply_volume(value).await,
        }
    }

    async fn apply_volume(&mut self, value: f32) {
        self.last_volume_apply = Some(Instant::now());
        self.mpv_driver.last_volume = value;
        if let Some(handle) = self.mpv_handle.as_ref() {
            if let Err(e) = handle.set_volume(value).await {
                warn!("mpv: set volume failed: {}", e);
            }
        }
    }

    // ── state machine ─────────────────────────────────────────────────────────

    /// Run `input` and any follow-up inputs produced by its effects.
    async fn dispatch(&mut self, input: PlayerInput) {
        let mut queue = VecDeque::from([input]);
        while let Some(input) = queue.pop_front() {
            let Some(transition) = self.playback.step(input) else {
                debug!("PlayerCore: {:?} ignored in {:?}", input, self.playback);
                continue;
            };
            info!(
                "PlayerCore: {:?} --{:?}--> {:?}",
                self.playback, input, transition.next
            );
            self.playback = transition.next;
            self.state_manager.set_playback(transition.next).await;
            self.notify();

            for effect in transition.effects {
                if let Some(follow_up) = self.run_effect(effect).await {
                    queue.push_back(follow_up);
                    break;
                }
            }
        }
    }

    /// Execute one effect.  A returned input aborts the remaining effects of
    /// the transition and is dispatched next.
    async fn run_effect(&mut self, effect: Effect) -> Option<PlayerInput> {
        debug!("PlayerCore: effect {:?}", effect);
        match effect {
            Effect::Report(status) => self.report(status).await,
            Effect::InitSession => return self.init_session().await,
            Effect::ReinitSession => {
                self.destroy_session().await;
                return self.init_session().await;
            }
            Effect::StartAudio | Effect::ResumeAudio => {
                let handle = self.mpv_handle.clone()?;
                if let Err(e) = handle.set_pause(false).await {
                    warn!("mpv: play failed: {}", e);
                    return Some(PlayerInput::PlaybackFailed);
                }
            }
            Effect::PauseAudio => {
                if let Some(handle) = self.mpv_handle.as_ref() {
                    if let Err(e) = handle.set_pause(true).await {
                        warn!("mpv: pause failed: {}", e);
                    }
                }
            }
            Effect::StartPoller => {
                if !self.poller.start() {
                    debug!("poller: already running");
                }
            }
            Effect::StopPoller => self.poller.stop(),
            Effect::ScheduleRetry(delay) => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(CoreEvent::RetryDue).await;
                });
            }
            Effect::ReloadStream => {
                let handle = self.mpv_handle.clone()?;
                let volume = self.mpv_driver.last_volume;
                if let Err(e) = handle.load_stream(&self.config.station.stream_url, volume).await {
                    error!("mpv: reload failed: {}", e);
                    return Some(PlayerInput::Fatal(StreamErrorKind::Other));
                }
            }
            Effect::RecoverMedia => {
                let handle = self.mpv_handle.clone()?;
                let volume = self.mpv_driver.last_volume;
                if let Err(e) = handle
                    .recover_media(&self.config.station.stream_url, volume)
                    .await
                {
                    error!("mpv: media recovery failed: {}", e);
                    return Some(PlayerInput::Fatal(StreamErrorKind::Other));
                }
            }
            Effect::DestroySession => self.destroy_session().await,
        }
        None
    }

    async fn init_session(&mut self) -> Option<PlayerInput> {
        let handle = match self.ensure_mpv_handle().await {
            Ok(h) => h,
            Err(e) => {
                error!("PlayerCore: failed to start mpv: {}", e);
                return Some(PlayerInput::Fatal(StreamErrorKind::Other));
            }
        };
        let volume = self.mpv_driver.last_volume;
        if let Err(e) = handle.load_stream(&self.config.station.stream_url, volume).await {
            error!("PlayerCore: failed to load stream: {}", e);
            return Some(PlayerInput::Fatal(StreamErrorKind::Other));
        }
        None
    }

    async fn ensure_mpv_handle(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(handle) = self.mpv_handle.clone() {
            if !self.mpv_driver.process_exited() {
                return Ok(handle);
            }
            warn!("PlayerCore: mpv process died, respawning");
            self.mpv_handle = None;
        }

        let (mpv_tx, mut mpv_rx) = mpsc::channel::<MpvEvent>(64);
        let core_tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(evt) = mpv_rx.recv().await {
                if core_tx.send(CoreEvent::Mpv(evt)).await.is_err() {
                    break;
                }
            }
        });

        let handle = self.mpv_driver.spawn_and_connect(mpv_tx).await?;
        // start paused; StartAudio unpauses once the stream is loaded
        handle.set_pause(true).await?;
        handle.observe_properties().await;
        self.mpv_handle = Some(handle.clone());
        Ok(handle)
    }

    async fn destroy_session(&mut self) {
        if let Some(handle) = self.mpv_handle.take() {
            let _ = handle.stop().await;
        }
        self.mpv_driver.kill().await;
    }

    // ── mpv events ────────────────────────────────────────────────────────────

    async fn handle_mpv_event(&mut self, evt: MpvEvent) {
        debug!("mpv event: {:?}", evt.raw);

        if let Some((obs_id, data)) = evt.as_property_change() {
            match obs_id {
                OBS_CORE_IDLE if self.playback == PlaybackState::Playing => {
                    match data.as_bool() {
                        Some(true) => {
                            self.report(Status::new("Connecting...", StatusKind::Connecting))
                                .await
                        }
                        Some(false) => self.report(StreamEvent::Playing.status()).await,
                        None => {}
                    }
                }
                OBS_PAUSE => debug!("mpv: pause → {:?}", data.as_bool()),
                _ => {}
            }
            return;
        }

        match evt.event_name() {
            Some("start-file") => {
                info!("mpv: start-file");
                self.report(StreamEvent::StartFile.status()).await;
            }
            Some("file-loaded") => {
                info!("mpv: file-loaded");
                self.report(StreamEvent::FileLoaded.status()).await;
                self.dispatch(PlayerInput::StreamReady).await;
            }
            Some("end-file") => {
                let reason = evt.end_reason().unwrap_or("unknown");
                info!("mpv: end-file reason={}", reason);
                match reason {
                    "error" => {
                        let detail = evt.file_error().unwrap_or("");
                        let kind = StreamErrorKind::classify(detail);
                        warn!("mpv: stream error '{}' classified {:?}", detail, kind);
                        self.dispatch(PlayerInput::Fatal(kind)).await;
                    }
                    "eof" => self.report(StreamEvent::Ended.status()).await,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    // ── metadata ──────────────────────────────────────────────────────────────

    async fn handle_metadata(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Fresh(np) => self.render(&np).await,
            PollOutcome::Unchanged => debug!("poller: unchanged payload"),
            PollOutcome::Skipped => debug!("poller: skipped"),
            PollOutcome::Failed(e) => {
                warn!("poller: metadata fetch failed: {}", e);
                self.report(Status::metadata_unavailable(&e.to_string()))
                    .await;
                if self.config.polling.placeholder_on_error {
                    self.render(&NowPlaying::placeholder()).await;
                }
            }
        }
    }

    async fn render(&mut self, np: &NowPlaying) {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let changed = self.state_manager.render_metadata(np, now_ms).await;

        let state = self.state_manager.get_state().await;
        if state.status.is_metadata_error() && self.playback == PlaybackState::Playing {
            self.state_manager.set_status(Status::playing()).await;
        }
        self.notify();

        if let Some(song_id) = changed {
            info!("PlayerCore: now playing {} ({})", state.now_playing.title, song_id);
            self.load_ratings(song_id);
            self.warm_cover(now_ms);
        }
    }

    fn load_ratings(&self, song_id: SongId) {
        let ratings = self.ratings.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = ratings.load(&song_id).await;
            let _ = tx.send(CoreEvent::RatingsLoaded { song_id, result }).await;
        });
    }

    /// Pull the new cover through the cache proxy so it is there offline.
    fn warm_cover(&self, now_ms: i64) {
        let Some(base) = self.config.cache_proxy_base() else {
            return;
        };
        let url = proxied_url(
            Some(&base),
            &cover_art_url(&self.config.station.cover_url, now_ms),
        );
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.get(&url).send().await {
                debug!("cache: cover warm-up failed: {}", e);
            }
        });
    }

    async fn cleanup(&mut self) {
        info!("PlayerCore: cleanup");
        self.poller.stop();
        self.destroy_session().await;
    }
}
