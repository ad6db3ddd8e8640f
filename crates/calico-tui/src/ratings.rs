//! Client for the rating service.
//!
//! Concurrent identical requests collapse into one: a request whose key
//! (`load-{id}` or `submit-{id}-{vote}`) is already in flight is not sent.
//! Submits are additionally throttled; a submit inside the throttle window
//! of the previous one is dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use calico_proto::config::RatingsConfig;
use calico_proto::metadata::SongId;
use calico_proto::rating::{RatingRequest, RatingState, Vote};
use reqwest::Client;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::proxied_url;
use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Throttled,
    Duplicate,
    Completed {
        success: bool,
        data: Option<RatingState>,
    },
}

#[derive(Clone)]
pub struct RatingClient {
    client: Client,
    base_url: String,
    /// Cache proxy origin for reads, when enabled.
    read_via: Option<String>,
    submit_throttle: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
    last_submit: Arc<Mutex<Option<Instant>>>,
}

/// Removes its key from the in-flight set on drop.
struct InFlight {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

impl RatingClient {
    pub fn new(client: Client, cfg: &RatingsConfig, read_via: Option<String>) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            read_via,
            submit_throttle: Duration::from_millis(cfg.submit_throttle_ms),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            last_submit: Arc::new(Mutex::new(None)),
        }
    }

    fn endpoint(&self, song_id: &SongId) -> String {
        format!("{}/api/ratings/{}", self.base_url, song_id)
    }

    fn begin(&self, key: String) -> Option<InFlight> {
        let mut set = self.in_flight.lock().ok()?;
        if !set.insert(key.clone()) {
            debug!("ratings: {} already in flight", key);
            return None;
        }
        Some(InFlight {
            set: Arc::clone(&self.in_flight),
            key,
        })
    }

    /// `Ok(None)` when the same load is already in flight.
    pub async fn load(&self, song_id: &SongId) -> Result<Option<RatingState>, FetchError> {
        let Some(_guard) = self.begin(format!("load-{song_id}")) else {
            return Ok(None);
        };

        let url = proxied_url(self.read_via.as_deref(), &self.endpoint(song_id));
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }
        let body = resp.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    pub async fn submit(&self, song_id: &SongId, vote: Vote) -> SubmitOutcome {
        if !self.take_submit_slot() {
            debug!("ratings: submit throttled");
            return SubmitOutcome::Throttled;
        }
        let Some(_guard) = self.begin(format!("submit-{song_id}-{vote}")) else {
            return SubmitOutcome::Duplicate;
        };

        let resp = match self
            .client
            .post(self.endpoint(song_id))
            .json(&RatingRequest { rating: vote })
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("ratings: submit failed: {}", e);
                return SubmitOutcome::Completed {
                    success: false,
                    data: None,
                };
            }
        };

        let success = resp.status().is_success();
        let data = match resp.json::<RatingState>().await {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("ratings: unreadable submit response: {}", e);
                None
            }
        };
        SubmitOutcome::Completed { success, data }
    }

    fn take_submit_slot(&self) -> bool {
        let Ok(mut last) = self.last_submit.lock() else {
            return false;
        };
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.submit_throttle {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Service {
        gets: Arc<AtomicUsize>,
        posts: Arc<AtomicUsize>,
        delay_ms: u64,
    }

    async fn get_rating(State(s): State<Service>, Path(id): Path<String>) -> Json<Value> {
        s.gets.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(s.delay_ms)).await;
        Json(json!({ "song_id": id, "thumbs_up": 4, "thumbs_down": 2, "user_rating": 1 }))
    }

    async fn post_rating(
        State(s): State<Service>,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        s.posts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(s.delay_ms)).await;
        match body["rating"].as_i64() {
            Some(r @ (1 | -1)) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Rating submitted successfully",
                    "song_id": id,
                    "thumbs_up": if r == 1 { 1 } else { 0 },
                    "thumbs_down": if r == -1 { 1 } else { 0 },
                    "user_rating": r,
                })),
            ),
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Rating must be 1 (thumbs up) or -1 (thumbs down)" })),
            ),
        }
    }

    async fn spawn_service(service: Service) -> String {
        let router = Router::new()
            .route("/api/ratings/:song_id", get(get_rating).post(post_rating))
            .with_state(service);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String, throttle_ms: u64) -> RatingClient {
        let cfg = RatingsConfig {
            base_url,
            submit_throttle_ms: throttle_ms,
        };
        RatingClient::new(Client::new(), &cfg, None)
    }

    fn song() -> SongId {
        SongId::from_parts(Some("Artist"), Some("Title"))
    }

    #[tokio::test]
    async fn test_load_reads_counts() {
        let base = spawn_service(Service::default()).await;
        let data = client(base, 1000).load(&song()).await.unwrap().unwrap();
        assert_eq!(data.up(), 4);
        assert_eq!(data.down(), 2);
        assert_eq!(data.user_vote(), Some(Vote::Up));
        assert_eq!(data.song_id.as_deref(), Some(song().as_str()));
    }

    #[tokio::test]
    async fn test_concurrent_loads_collapse() {
        let service = Service {
            delay_ms: 200,
            ..Service::default()
        };
        let gets = service.gets.clone();
        let c = client(spawn_service(service).await, 1000);
        let id = song();

        let (a, b) = tokio::join!(c.load(&id), c.load(&id));
        let loaded = [a.unwrap(), b.unwrap()];
        assert_eq!(loaded.iter().filter(|r| r.is_some()).count(), 1);
        assert_eq!(gets.load(Ordering::SeqCst), 1);

        // key released once the first call completed
        assert!(c.load(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_submit_then_throttled() {
        let service = Service::default();
        let posts = service.posts.clone();
        let c = client(spawn_service(service).await, 60_000);

        match c.submit(&song(), Vote::Down).await {
            SubmitOutcome::Completed { success, data } => {
                assert!(success);
                let data = data.unwrap();
                assert_eq!(data.message.as_deref(), Some("Rating submitted successfully"));
                assert_eq!(data.user_vote(), Some(Vote::Down));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(c.submit(&song(), Vote::Up).await, SubmitOutcome::Throttled);
        assert_eq!(posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_submit_in_flight() {
        let service = Service {
            delay_ms: 200,
            ..Service::default()
        };
        let posts = service.posts.clone();
        let c = client(spawn_service(service).await, 0);
        let id = song();

        let (a, b) = tokio::join!(c.submit(&id, Vote::Up), c.submit(&id, Vote::Up));
        assert!([&a, &b].contains(&&SubmitOutcome::Duplicate));
        assert_eq!(posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_network_failure() {
        let c = client("http://127.0.0.1:9".to_string(), 0);
        assert_eq!(
            c.submit(&song(), Vote::Up).await,
            SubmitOutcome::Completed {
                success: false,
                data: None
            }
        );
    }
}
