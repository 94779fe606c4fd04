//! Response snapshot whose body can be read any number of times.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Debug)]
struct Snapshot {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// A completed response with its body captured exactly once.
///
/// Cloning is cheap and shares the captured state, so deduplicated callers and
/// cache hits all observe the same body.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    inner: Arc<Snapshot>,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Snapshot {
                status,
                headers,
                body: body.into(),
            }),
        }
    }

    /// `true` for 2xx.
    pub fn ok(&self) -> bool {
        self.inner.status.is_success()
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    pub fn text(&self) -> &str {
        &self.inner.body
    }

    /// Parse the captured body. `None` when it is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(&self.inner.body).ok()
    }

    pub fn json_value(&self) -> Option<serde_json::Value> {
        self.json()
    }

    /// Whether both handles wrap the very same snapshot.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}
