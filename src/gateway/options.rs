//! Request targets and per-call options.

use crate::transport::{Credentials, OutboundRequest};
use crate::Result;
use reqwest::Method;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a caller asks the gateway to fetch.
#[derive(Debug, Clone)]
pub enum RequestTarget {
    /// Absolute or relative URL, e.g. `/api/me`.
    Url(String),
    /// A prebuilt request; its fields, plus any options, form the signature.
    Request(RequestDescriptor),
}

impl RequestTarget {
    /// The URL string when the target is a plain URL. Only these are cache-eligible.
    pub fn as_url(&self) -> Option<&str> {
        match self {
            RequestTarget::Url(url) => Some(url),
            RequestTarget::Request(_) => None,
        }
    }

    pub(crate) fn into_outbound(self, options: Option<&FetchOptions>) -> OutboundRequest {
        let mut request = match self {
            RequestTarget::Url(url) => OutboundRequest::get(url),
            RequestTarget::Request(desc) => OutboundRequest {
                url: desc.url,
                method: desc.method,
                headers: desc.headers,
                body: desc.body,
                credentials: None,
            },
        };
        if let Some(opts) = options {
            if let Some(method) = &opts.method {
                request.method = method.clone();
            }
            for (k, v) in &opts.headers {
                request.headers.insert(k.clone(), v.clone());
            }
            if opts.body.is_some() {
                request.body = opts.body.clone();
            }
            request.credentials = opts.credentials;
        }
        request
    }
}

impl From<&str> for RequestTarget {
    fn from(url: &str) -> Self {
        RequestTarget::Url(url.to_string())
    }
}

impl From<String> for RequestTarget {
    fn from(url: String) -> Self {
        RequestTarget::Url(url)
    }
}

impl From<&String> for RequestTarget {
    fn from(url: &String) -> Self {
        RequestTarget::Url(url.clone())
    }
}

impl From<RequestDescriptor> for RequestTarget {
    fn from(desc: RequestDescriptor) -> Self {
        RequestTarget::Request(desc)
    }
}

/// A request described as data rather than a bare URL.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDescriptor {
    pub url: String,
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Per-call options. The serialized form (camelCase, unset fields omitted)
/// is part of the request signature; the cancellation token is not.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_method"
    )]
    pub method: Option<Method>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// Opting in to a token opts out of deduplication.
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
    #[serde(
        rename = "cacheTTL",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_millis"
    )]
    pub cache_ttl: Option<Duration>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and mark it `application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Some(serde_json::to_string(value)?);
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

fn serialize_method<S: Serializer>(method: &Method, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(method.as_str())
}

fn serialize_opt_method<S: Serializer>(
    method: &Option<Method>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match method {
        Some(m) => s.serialize_str(m.as_str()),
        None => s.serialize_none(),
    }
}

fn serialize_opt_millis<S: Serializer>(
    ttl: &Option<Duration>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match ttl {
        Some(d) => s.serialize_u64(d.as_millis() as u64),
        None => s.serialize_none(),
    }
}
