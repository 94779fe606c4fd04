//! Short-lived response cache for the hot identity endpoint.

use super::response::CachedResponse;
use super::signature::RequestSignature;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

struct ShortCacheEntry {
    value: CachedResponse,
    expires_at: Instant,
}

/// Entries are never evicted proactively: a stale one stays until it is
/// overwritten, it just stops being served.
#[derive(Default)]
pub(crate) struct ShortCache {
    entries: Mutex<HashMap<RequestSignature, ShortCacheEntry>>,
}

impl ShortCache {
    pub fn get(&self, key: &RequestSignature) -> Option<CachedResponse> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: RequestSignature, value: CachedResponse, ttl: Duration) {
        let entry = ShortCacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }

    /// Stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;

    fn response(body: &str) -> CachedResponse {
        CachedResponse::new(StatusCode::OK, HeaderMap::new(), body)
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_on_read_but_stay_stored() {
        let cache = ShortCache::default();
        let key = RequestSignature::from("/api/me::");
        cache.insert(key.clone(), response("me"), Duration::from_millis(1500));

        tokio::time::advance(Duration::from_millis(1499)).await;
        assert_eq!(cache.get(&key).map(|r| r.text().to_string()).as_deref(), Some("me"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_restarts_the_ttl() {
        let cache = ShortCache::default();
        let key = RequestSignature::from("/api/me::");
        cache.insert(key.clone(), response("old"), Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(200)).await;
        cache.insert(key.clone(), response("new"), Duration::from_millis(100));
        assert_eq!(cache.get(&key).map(|r| r.text().to_string()).as_deref(), Some("new"));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
