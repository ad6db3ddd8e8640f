//! Named on-disk cache.  Each entry is a JSON sidecar plus a body file, both
//! named by the md5 of the cache key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::CacheError;

/// Header recording when an entry was stored, in epoch milliseconds.
pub const CACHED_AT: &str = "cached-at";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }

    /// Milliseconds since the entry was stored.  Missing or unparsable
    /// timestamps read as 0, which makes the entry very old.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        let at = self
            .header(CACHED_AT)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        now_ms - at
    }
}

pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub async fn open(root: &Path, name: &str) -> Result<Self, CacheError> {
        let dir = root.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn paths(&self, key: &str) -> (PathBuf, PathBuf) {
        let digest = format!("{:x}", md5::compute(key.as_bytes()));
        (
            self.dir.join(format!("{digest}.json")),
            self.dir.join(format!("{digest}.body")),
        )
    }

    pub async fn get(&self, key: &str) -> Result<Option<StoredResponse>, CacheError> {
        let (meta_path, body_path) = self.paths(key);
        let meta = match tokio::fs::read(&meta_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut entry: StoredResponse = serde_json::from_slice(&meta)?;
        entry.body = tokio::fs::read(&body_path).await?;
        Ok(Some(entry))
    }

    /// Body first, sidecar last: a sidecar is only visible once its body exists.
    pub async fn put(&self, key: &str, entry: &StoredResponse) -> Result<(), CacheError> {
        let (meta_path, body_path) = self.paths(key);
        tokio::fs::write(&body_path, &entry.body).await?;
        tokio::fs::write(&meta_path, serde_json::to_vec_pretty(entry)?).await?;
        debug!("cache: stored {} ({} bytes)", key, entry.body.len());
        Ok(())
    }

    /// Names of the caches that exist under `root`.
    pub async fn list(root: &Path) -> Result<Vec<String>, CacheError> {
        let mut names = Vec::new();
        let mut dir = match tokio::fs::read_dir(root).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete every cache under `root` other than `keep`.
    pub async fn delete_others(root: &Path, keep: &str) -> Result<Vec<String>, CacheError> {
        let mut deleted = Vec::new();
        for name in Self::list(root).await? {
            if name != keep {
                info!("cache: deleting old cache {}", name);
                tokio::fs::remove_dir_all(root.join(&name)).await?;
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(body: &str) -> StoredResponse {
        StoredResponse {
            url: "https://cdn/cover.jpg".into(),
            status: 200,
            headers: vec![("content-type".into(), "image/jpeg".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_get() {
        let root = tempfile::tempdir().unwrap();
        let store = CacheStore::open(root.path(), "v1").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());

        store.put("k", &entry("jpeg bytes")).await.unwrap();
        let got = store.get("k").await.unwrap().unwrap();
        assert_eq!(got, entry("jpeg bytes"));
        assert_eq!(got.header("Content-Type"), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_delete_others() {
        let root = tempfile::tempdir().unwrap();
        CacheStore::open(root.path(), "radio-v0").await.unwrap();
        CacheStore::open(root.path(), "scratch").await.unwrap();
        let keep = CacheStore::open(root.path(), "radio-v1").await.unwrap();
        keep.put("k", &entry("x")).await.unwrap();

        let deleted = CacheStore::delete_others(root.path(), "radio-v1").await.unwrap();
        assert_eq!(deleted, vec!["radio-v0".to_string(), "scratch".to_string()]);
        assert_eq!(CacheStore::list(root.path()).await.unwrap(), vec!["radio-v1"]);
        assert!(keep.get("k").await.unwrap().is_some());
    }

    #[test]
    fn test_age() {
        let mut e = entry("x");
        assert_eq!(e.age_ms(1_000), 1_000);
        e.set_header(CACHED_AT, "400".into());
        e.set_header(CACHED_AT, "600".into());
        assert_eq!(e.age_ms(1_000), 400);
        assert_eq!(e.headers.len(), 2);
    }
}
