//! Offline cache proxy.
//!
//! A local axum server that answers `GET /fetch?url=<absolute url>` from a
//! named on-disk cache, choosing a strategy per URL (see [`strategy`]).
//! `install` precaches the same-origin assets; `activate` removes caches
//! left behind under other names.  Both run in the background once the
//! listener is bound.

mod error;
mod store;
mod strategy;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use calico_proto::config::CacheConfig;
use futures_util::future::try_join_all;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub use error::CacheError;
pub use store::{CacheStore, StoredResponse, CACHED_AT};
pub use strategy::{cache_key, Rules, Strategy};

/// Response headers that are not replayed from the cache.
const SKIPPED_HEADERS: &[&str] = &["connection", "content-length", "transfer-encoding"];

/// Route `target` through the cache proxy at `proxy_base`, or return it as is.
pub fn proxied_url(proxy_base: Option<&str>, target: &str) -> String {
    let Some(base) = proxy_base else {
        return target.to_string();
    };
    match Url::parse_with_params(&format!("{}/fetch", base.trim_end_matches('/')), [("url", target)]) {
        Ok(u) => u.to_string(),
        Err(e) => {
            warn!("cache: bad proxy base {}: {}", base, e);
            target.to_string()
        }
    }
}

pub struct OfflineCache {
    store: CacheStore,
    root: PathBuf,
    cache_name: String,
    client: Client,
    /// Origin the precache paths are relative to.
    origin: String,
    cdn_host: Option<String>,
    precache: Vec<String>,
    api_freshness: Duration,
}

impl OfflineCache {
    pub async fn open(
        cfg: &CacheConfig,
        root: PathBuf,
        origin: String,
        cdn_host: Option<String>,
        client: Client,
    ) -> Result<Self, CacheError> {
        let store = CacheStore::open(&root, &cfg.cache_name).await?;
        Ok(Self {
            store,
            root,
            cache_name: cfg.cache_name.clone(),
            client,
            origin: origin.trim_end_matches('/').to_string(),
            cdn_host,
            precache: cfg.precache.clone(),
            api_freshness: Duration::from_secs(cfg.api_freshness_secs),
        })
    }

    fn rules(&self) -> Rules<'_> {
        Rules {
            cdn_host: self.cdn_host.as_deref(),
            assets: &self.precache,
        }
    }

    /// Fetch every same-origin precache entry, then store them all.  Any
    /// failure aborts the install before anything is written.
    pub async fn install(&self) -> Result<usize, CacheError> {
        let fetches = self
            .precache
            .iter()
            .filter(|a| !a.starts_with("http"))
            .map(|asset| async move {
                let url = format!("{}{}", self.origin, asset);
                let resp = self.network(&url).await?;
                if !(200..300).contains(&resp.status) {
                    return Err(CacheError::Status {
                        url,
                        status: resp.status,
                    });
                }
                Ok::<_, CacheError>(resp)
            });
        let fetched = try_join_all(fetches).await?;

        for resp in &fetched {
            self.store.put(&resp.url, resp).await?;
        }
        info!("cache: installed {} assets into {}", fetched.len(), self.cache_name);
        Ok(fetched.len())
    }

    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        CacheStore::delete_others(&self.root, &self.cache_name).await
    }

    /// Answer one request.  Returns `503 Offline` when the network is down
    /// and nothing usable is cached.
    pub async fn respond(self: &Arc<Self>, raw_url: &str) -> StoredResponse {
        let url = match parse_target(raw_url) {
            Ok(u) => u,
            Err(e) => {
                warn!("cache: {}", e);
                return plain(raw_url, StatusCode::BAD_REQUEST, "Bad Request");
            }
        };
        let strategy = self.rules().classify(&url);
        let key = cache_key(&url, self.cdn_host.as_deref());
        debug!("cache: {:?} {}", strategy, url);

        let result = match strategy {
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(&url, &key).await,
            Strategy::CacheFirst => self.cache_first(&url, &key).await,
            Strategy::NetworkFirst => self.network_first(&url, &key).await,
            Strategy::Passthrough => self.network(url.as_str()).await,
        };

        result.unwrap_or_else(|e| {
            warn!("cache: {} unavailable: {}", url, e);
            offline(url.as_str())
        })
    }

    async fn stale_while_revalidate(
        self: &Arc<Self>,
        url: &Url,
        key: &str,
    ) -> Result<StoredResponse, CacheError> {
        let cached = self.lookup(key).await;
        if let Some(hit) = &cached {
            let fresh_ms = self.api_freshness.as_millis() as i64;
            if hit.age_ms(now_ms()) < fresh_ms {
                let this = Arc::clone(self);
                let (url, key) = (url.to_string(), key.to_string());
                tokio::spawn(async move {
                    if let Err(e) = this.fetch_and_store(&url, &key).await {
                        debug!("cache: background revalidate of {} failed: {}", url, e);
                    }
                });
                return Ok(hit.clone());
            }
        }

        match self.fetch_and_store(url.as_str(), key).await {
            Ok(resp) => Ok(resp),
            Err(e) => cached.ok_or(e),
        }
    }

    async fn cache_first(&self, url: &Url, key: &str) -> Result<StoredResponse, CacheError> {
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }
        self.fetch_and_store(url.as_str(), key).await
    }

    async fn network_first(&self, url: &Url, key: &str) -> Result<StoredResponse, CacheError> {
        match self.fetch_and_store(url.as_str(), key).await {
            Ok(resp) => Ok(resp),
            Err(e) => self.lookup(key).await.ok_or(e),
        }
    }

    async fn lookup(&self, key: &str) -> Option<StoredResponse> {
        match self.store.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("cache: unreadable entry for {}: {}", key, e);
                None
            }
        }
    }

    /// Network fetch; 2xx responses are stored with a `cached-at` stamp.
    async fn fetch_and_store(&self, url: &str, key: &str) -> Result<StoredResponse, CacheError> {
        let mut resp = self.network(url).await?;
        if (200..300).contains(&resp.status) {
            resp.set_header(CACHED_AT, now_ms().to_string());
            if let Err(e) = self.store.put(key, &resp).await {
                warn!("cache: failed to store {}: {}", url, e);
            }
        }
        Ok(resp)
    }

    async fn network(&self, url: &str) -> Result<StoredResponse, CacheError> {
        let upstream = self.client.get(url).send().await?;
        let status = upstream.status().as_u16();
        let headers = upstream
            .headers()
            .iter()
            .filter(|(name, _)| !SKIPPED_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = upstream.bytes().await?.to_vec();
        Ok(StoredResponse {
            url: url.to_string(),
            status,
            headers,
            body,
        })
    }
}

/// Only absolute http(s) URLs are proxied.
fn parse_target(raw: &str) -> Result<Url, CacheError> {
    let url = Url::parse(raw).map_err(|e| CacheError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CacheError::InvalidUrl(format!("{raw}: unsupported scheme {other}"))),
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn plain(url: &str, status: StatusCode, text: &str) -> StoredResponse {
    StoredResponse {
        url: url.to_string(),
        status: status.as_u16(),
        headers: vec![("content-type".into(), "text/plain".into())],
        body: text.as_bytes().to_vec(),
    }
}

fn offline(url: &str) -> StoredResponse {
    plain(url, StatusCode::SERVICE_UNAVAILABLE, "Offline")
}

// ── axum surface ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FetchParams {
    url: String,
}

async fn fetch_through_cache(
    State(cache): State<Arc<OfflineCache>>,
    Query(params): Query<FetchParams>,
) -> Response {
    into_response(cache.respond(&params.url).await)
}

fn into_response(entry: StoredResponse) -> Response {
    let status = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (name, value) in &entry.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match builder.body(Body::from(entry.body)) {
        Ok(r) => r,
        Err(e) => {
            warn!("cache: could not build response: {}", e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

pub fn router(cache: Arc<OfflineCache>) -> Router {
    Router::new()
        .route("/fetch", get(fetch_through_cache))
        .with_state(cache)
}

/// Bind the proxy listener.  Failing here disables the proxy.
pub async fn bind(bind_address: &str, port: u16) -> Result<tokio::net::TcpListener, CacheError> {
    let addr = format!("{}:{}", bind_address, port);
    tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| CacheError::Bind { addr, source })
}

/// Serve on `listener` at once; install and activate run alongside.  Install
/// failures are logged and the proxy keeps serving whatever the cache holds.
pub fn start_server(
    listener: tokio::net::TcpListener,
    cache: Arc<OfflineCache>,
) -> tokio::task::JoinHandle<()> {
    let prepare = Arc::clone(&cache);
    tokio::spawn(async move {
        if let Err(e) = prepare.install().await {
            warn!("cache: install failed: {}", e);
        }
        match prepare.activate().await {
            Ok(deleted) if !deleted.is_empty() => info!("cache: removed {:?}", deleted),
            Ok(_) => {}
            Err(e) => warn!("cache: activate failed: {}", e),
        }
    });

    tokio::spawn(async move {
        match listener.local_addr() {
            Ok(addr) => info!("Cache proxy listening on http://{}", addr),
            Err(e) => debug!("cache: listener address unavailable: {}", e),
        }
        if let Err(e) = axum::serve(listener, router(cache)).await {
            warn!("Cache proxy error: {}", e);
        }
    })
}
