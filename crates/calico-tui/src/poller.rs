//! Metadata poller.
//!
//! `PollerHandle` owns at most one interval task.  Each tick runs
//! `MetadataFetcher::fetch`, which skips calls that come too soon after the
//! previous one, bounds the request with a timeout, and drops payloads that
//! are identical to one of the last few it has seen.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use calico_proto::config::PollingConfig;
use calico_proto::metadata::NowPlaying;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::FetchError;

#[derive(Debug)]
pub enum PollOutcome {
    Fresh(NowPlaying),
    /// Same payload as one recently rendered.
    Unchanged,
    /// Inside the de-duplication window; no request was made.
    Skipped,
    Failed(FetchError),
}

pub struct MetadataFetcher {
    client: Client,
    url: String,
    timeout: Duration,
    dedupe_window: Duration,
    cache_size: usize,
    last_call: Option<Instant>,
    recent_payloads: VecDeque<String>,
}

impl MetadataFetcher {
    pub fn new(client: Client, url: String, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
            dedupe_window: Duration::ZERO,
            cache_size: 0,
            last_call: None,
            recent_payloads: VecDeque::new(),
        }
    }

    pub fn from_config(client: Client, url: String, cfg: &PollingConfig) -> Self {
        Self::new(client, url, Duration::from_secs(cfg.request_timeout_secs))
            .with_dedupe_window(Duration::from_millis(cfg.dedupe_window_ms))
            .with_payload_cache(cfg.payload_cache_size)
    }

    pub fn with_dedupe_window(mut self, window: Duration) -> Self {
        self.dedupe_window = window;
        self
    }

    pub fn with_payload_cache(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    pub async fn fetch(&mut self) -> PollOutcome {
        let now = Instant::now();
        if let Some(last) = self.last_call {
            if !self.dedupe_window.is_zero() && now.duration_since(last) < self.dedupe_window {
                debug!("poller: skipped, {:?} since last call", now.duration_since(last));
                return PollOutcome::Skipped;
            }
        }
        self.last_call = Some(now);

        let value = match tokio::time::timeout(self.timeout, self.request()).await {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => return PollOutcome::Failed(e),
            Err(_) => return PollOutcome::Failed(FetchError::Timeout(self.timeout)),
        };

        if self.cache_size > 0 {
            let key = value.to_string();
            if self.recent_payloads.contains(&key) {
                debug!("poller: payload unchanged");
                return PollOutcome::Unchanged;
            }
            self.recent_payloads.push_back(key);
            while self.recent_payloads.len() > self.cache_size {
                self.recent_payloads.pop_front();
            }
        }

        PollOutcome::Fresh(NowPlaying::from_value(&value))
    }

    async fn request(&self) -> Result<Value, FetchError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Start/stop control for the interval task.
pub struct PollerHandle {
    fetcher: Arc<Mutex<MetadataFetcher>>,
    interval: Duration,
    tx: mpsc::Sender<PollOutcome>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn new(fetcher: MetadataFetcher, interval: Duration, tx: mpsc::Sender<PollOutcome>) -> Self {
        Self {
            fetcher: Arc::new(Mutex::new(fetcher)),
            interval,
            tx,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Returns false when an interval task is already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        info!("poller: start, every {:?}", self.interval);

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = fetcher.lock().await.fetch().await;
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
        }));
        true
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            info!("poller: stop");
            task.abort();
        }
    }

    /// One fetch outside the cadence.
    pub fn fetch_once(&self) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = fetcher.lock().await.fetch().await;
            if tx.send(outcome).await.is_err() {
                warn!("poller: receiver gone");
            }
        });
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
