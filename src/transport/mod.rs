//! 전송 계층: 게이트웨이가 감싸는 기본 HTTP 요청 프리미티브.
//!
//! # Transport Layer
//!
//! The gateway never talks to the network directly. It drives a [`Transport`],
//! which performs exactly one attempt per call and reports either a response
//! (any status, including 429) or a [`TransportError`]. Retry, dedup and caching
//! all live above this seam, so tests swap in a scripted transport.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Transport`] | One-shot request primitive |
//! | [`HttpTransport`] | `reqwest`-backed implementation |
//! | [`OutboundRequest`] | Fully resolved request handed to a transport |
//! | [`TransportResponse`] | Status, headers and a not-yet-read body |

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whether the session cookie rides along. Unset behaves as `SameOrigin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    SameOrigin,
    Include,
}

/// A request after target and options have been merged.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub credentials: Option<Credentials>,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: BTreeMap::new(),
            body: None,
            credentials: None,
        }
    }

    /// Targets like `/api/me` that must be resolved against a base URL.
    pub fn is_relative(&self) -> bool {
        self.url.starts_with('/')
    }
}

enum ResponseBody {
    Buffered(Bytes),
    Http(reqwest::Response),
}

/// Response of a single attempt. The body is read lazily so a 429 that is
/// about to be retried never pays for materializing its payload.
pub struct TransportResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl TransportResponse {
    /// A response whose body is already in memory.
    pub fn buffered(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: ResponseBody::Buffered(body.into()),
        }
    }

    pub(crate) fn from_reqwest(resp: reqwest::Response) -> Self {
        Self {
            status: resp.status(),
            headers: resp.headers().clone(),
            body: ResponseBody::Http(resp),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Consume the body as text. Invalid UTF-8 is replaced, not rejected.
    pub async fn into_parts(self) -> Result<(StatusCode, HeaderMap, String), TransportError> {
        let text = match self.body {
            ResponseBody::Buffered(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            ResponseBody::Http(resp) => resp.text().await?,
        };
        Ok((self.status, self.headers, text))
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// One network attempt. Implementations must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// Failure below the HTTP layer. `Clone` so a single deduplicated outcome can
/// be handed to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    #[error("Invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(Arc::new(e))
    }
}
