mod action;
mod app;
mod app_state;
mod cache;
mod component;
mod components;
mod core;
mod error;
mod mpv;
mod poller;
mod ratings;
mod theme;
mod widgets;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

/// What the PlayerCore broadcasts to the UI.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// The SessionState has changed; receivers should fetch from StateManager.
    StateUpdated,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = calico_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("calico.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("calico log: {}", log_path.display());

    tracing::info!("calico starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = calico_proto::config::Config::load().unwrap_or_else(|e| {
        tracing::warn!("config load failed, using defaults: {}", e);
        Default::default()
    });

    // ── Broadcast channel (PlayerCore → TUI) ─────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    // ── CoreEvent channel (TUI → PlayerCore) ─────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<core::CoreEvent>(1024);

    // ── Offline cache proxy ──────────────────────────────────────────────────
    // Bound before PlayerCore is built: the core only routes through the
    // proxy while `cache.enabled` holds.
    if config.cache.enabled {
        if let Err(e) = start_cache_proxy(&config).await {
            tracing::warn!("cache: proxy disabled: {}", e);
            config.cache.enabled = false;
        }
    }

    // ── Build PlayerCore ─────────────────────────────────────────────────────
    let player_core = core::PlayerCore::new(config, broadcast_tx.clone(), event_tx.clone())?;
    let state_manager = player_core.state_manager();

    // The broadcast channel only carries deltas, so push one StateUpdated now
    // for the first frame.
    let _ = broadcast_tx.send(BroadcastMessage::StateUpdated);

    // ── Spawn PlayerCore event loop ──────────────────────────────────────────
    let core_task = tokio::spawn(async move {
        if let Err(e) = player_core.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(event_tx, state_manager, log_path);
    app.run(broadcast_rx).await?;

    // The app sends Shutdown on quit; give the core a moment to stop mpv.
    if tokio::time::timeout(std::time::Duration::from_secs(2), core_task)
        .await
        .is_err()
    {
        tracing::warn!("PlayerCore did not stop in time");
    }

    Ok(())
}

async fn start_cache_proxy(config: &calico_proto::config::Config) -> anyhow::Result<()> {
    let cdn_host = reqwest::Url::parse(&config.station.metadata_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(
            config.cache.upstream_timeout_ms,
        ))
        .build()?;
    let offline = cache::OfflineCache::open(
        &config.cache,
        calico_proto::platform::cache_dir(),
        config.ratings.base_url.clone(),
        cdn_host,
        client,
    )
    .await?;
    let listener = cache::bind(&config.cache.bind_address, config.cache.port).await?;
    cache::start_server(listener, Arc::new(offline));
    Ok(())
}
