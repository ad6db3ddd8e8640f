use reqwest::Url;

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve a fresh cached copy and revalidate in the background; otherwise
    /// go to the network and fall back to any cached copy.
    StaleWhileRevalidate,
    CacheFirst,
    NetworkFirst,
    /// Not intercepted.
    Passthrough,
}

/// Request routing rules, checked in order.
pub struct Rules<'a> {
    /// Host of the station CDN (metadata and cover art).
    pub cdn_host: Option<&'a str>,
    /// Precached asset list; a request whose path equals an entry is static.
    pub assets: &'a [String],
}

impl Rules<'_> {
    pub fn classify(&self, url: &Url) -> Strategy {
        let path = url.path();

        if path.starts_with("/api/") {
            return Strategy::StaleWhileRevalidate;
        }
        if path.starts_with("/static/") || self.assets.iter().any(|a| a == path) {
            return Strategy::CacheFirst;
        }
        if self.cdn_host.is_some()
            && url.host_str() == self.cdn_host
            && (path.contains("metadata") || path.contains("cover"))
        {
            return Strategy::NetworkFirst;
        }
        Strategy::Passthrough
    }
}

/// Cache key for a URL.  Cover art carries a cache-busting `t` parameter on
/// every request; the key drops it so the offline copy is always the latest
/// cover fetched.
pub fn cache_key(url: &Url, cdn_host: Option<&str>) -> String {
    let is_cover = cdn_host.is_some() && url.host_str() == cdn_host && url.path().contains("cover");
    if !is_cover || url.query().is_none() {
        return url.to_string();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "t")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut key = url.clone();
    if kept.is_empty() {
        key.set_query(None);
    } else {
        key.query_pairs_mut().clear().extend_pairs(kept);
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CDN: &str = "d3d4yli4hf5bmh.cloudfront.net";

    fn classify(url: &str) -> Strategy {
        let assets = vec!["/".to_string(), "/static/styles.css".to_string()];
        let rules = Rules {
            cdn_host: Some(CDN),
            assets: &assets,
        };
        rules.classify(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("http://127.0.0.1:3000/api/ratings/abc"),
            Strategy::StaleWhileRevalidate
        );
        assert_eq!(classify("http://127.0.0.1:3000/static/app.js"), Strategy::CacheFirst);
        assert_eq!(classify("http://127.0.0.1:3000/"), Strategy::CacheFirst);
        assert_eq!(
            classify("https://d3d4yli4hf5bmh.cloudfront.net/metadatav2.json"),
            Strategy::NetworkFirst
        );
        assert_eq!(
            classify("https://d3d4yli4hf5bmh.cloudfront.net/cover.jpg?t=1"),
            Strategy::NetworkFirst
        );
        assert_eq!(
            classify("https://d3d4yli4hf5bmh.cloudfront.net/hls/live.m3u8"),
            Strategy::Passthrough
        );
        assert_eq!(
            classify("https://elsewhere.example/metadata.json"),
            Strategy::Passthrough
        );
    }

    #[test]
    fn test_cover_key_ignores_timestamp() {
        let a = Url::parse("https://d3d4yli4hf5bmh.cloudfront.net/cover.jpg?t=1").unwrap();
        let b = Url::parse("https://d3d4yli4hf5bmh.cloudfront.net/cover.jpg?t=2").unwrap();
        assert_eq!(cache_key(&a, Some(CDN)), cache_key(&b, Some(CDN)));
        assert_eq!(
            cache_key(&a, Some(CDN)),
            "https://d3d4yli4hf5bmh.cloudfront.net/cover.jpg"
        );

        let sized = Url::parse("https://d3d4yli4hf5bmh.cloudfront.net/cover.jpg?size=l&t=9").unwrap();
        assert_eq!(
            cache_key(&sized, Some(CDN)),
            "https://d3d4yli4hf5bmh.cloudfront.net/cover.jpg?size=l"
        );

        let api = Url::parse("http://127.0.0.1:3000/api/ratings/x?t=1").unwrap();
        assert_eq!(cache_key(&api, Some(CDN)), api.to_string());
    }
}
