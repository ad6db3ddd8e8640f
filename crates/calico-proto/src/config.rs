use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub ratings: RatingsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// Upstream endpoints for the station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_station_name")]
    pub name: String,
    /// HLS manifest handed to mpv.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// JSON now-playing document polled while playing.
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    /// Cover art for the current track; a fresh `?t=` is appended on every update.
    #[serde(default = "default_cover_url")]
    pub cover_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Calls closer than this to the previous one are skipped. 0 disables.
    #[serde(default = "default_dedupe_window_ms")]
    pub dedupe_window_ms: u64,
    /// How many recent raw payloads to remember for identity de-duplication. 0 disables.
    #[serde(default = "default_payload_cache_size")]
    pub payload_cache_size: usize,
    /// Render the built-in placeholder track when a poll fails.
    #[serde(default)]
    pub placeholder_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingsConfig {
    /// Origin of the rating service; requests go to `{base_url}/api/ratings/{song_id}`.
    #[serde(default = "default_ratings_base_url")]
    pub base_url: String,
    #[serde(default = "default_submit_throttle_ms")]
    pub submit_throttle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    #[serde(default = "default_volume_throttle_ms")]
    pub volume_throttle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_cache_port")]
    pub port: u16,
    /// Name of the active cache. Caches under any other name are deleted on activation.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
    #[serde(default = "default_api_freshness_secs")]
    pub api_freshness_secs: u64,
    /// Upstream timeout of the proxy.  Must stay below
    /// `polling.request_timeout_secs` for cached fallbacks to reach the poller.
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
    /// Assets fetched into the cache on install. Only same-origin paths are fetched.
    #[serde(default)]
    pub precache: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            name: default_station_name(),
            stream_url: default_stream_url(),
            metadata_url: default_metadata_url(),
            cover_url: default_cover_url(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            dedupe_window_ms: default_dedupe_window_ms(),
            payload_cache_size: default_payload_cache_size(),
            placeholder_on_error: false,
        }
    }
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            base_url: default_ratings_base_url(),
            submit_throttle_ms: default_submit_throttle_ms(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            volume_throttle_ms: default_volume_throttle_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            bind_address: default_bind_address(),
            port: default_cache_port(),
            cache_name: default_cache_name(),
            api_freshness_secs: default_api_freshness_secs(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            precache: Vec::new(),
        }
    }
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("state.json")
}

fn default_station_name() -> String {
    "Radio Calico".to_string()
}

fn default_stream_url() -> String {
    "https://d3d4yli4hf5bmh.cloudfront.net/hls/live.m3u8".to_string()
}

fn default_metadata_url() -> String {
    "https://d3d4yli4hf5bmh.cloudfront.net/metadatav2.json".to_string()
}

fn default_cover_url() -> String {
    "https://d3d4yli4hf5bmh.cloudfront.net/cover.jpg".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_dedupe_window_ms() -> u64 {
    1000
}

fn default_payload_cache_size() -> usize {
    3
}

fn default_ratings_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_submit_throttle_ms() -> u64 {
    1000
}

fn default_volume() -> f32 {
    0.7
}

fn default_volume_throttle_ms() -> u64 {
    50
}

fn default_cache_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_cache_port() -> u16 {
    8991
}

fn default_cache_name() -> String {
    "radio-russell-v1".to_string()
}

fn default_api_freshness_secs() -> u64 {
    300
}

fn default_upstream_timeout_ms() -> u64 {
    3000
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            tracing::info!("wrote default config to {}", config_path.display());
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Base URL of the local cache proxy, e.g. `http://127.0.0.1:8991`.
    pub fn cache_proxy_base(&self) -> Option<String> {
        self.cache
            .enabled
            .then(|| format!("http://{}:{}", self.cache.bind_address, self.cache.port))
    }
}
