use super::{Credentials, OutboundRequest, Transport, TransportError, TransportResponse};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, COOKIE};
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use url::Url;

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<Url>,
    session_cookie: Option<String>,
}

impl HttpTransport {
    /// Build a transport from `TODAK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(
                env_parse::<usize>("TODAK_HTTP_POOL_MAX_IDLE_PER_HOST").unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env_parse::<u64>("TODAK_HTTP_POOL_IDLE_TIMEOUT_SECS").unwrap_or(90),
            )));

        // Unbounded unless asked for; retry and backoff are the only limits.
        if let Some(secs) = env_parse::<u64>("TODAK_HTTP_TIMEOUT_SECS") {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Ok(proxy_url) = env::var("TODAK_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::from(e)))?;

        let mut transport = Self::with_client(client);
        if let Ok(base) = env::var("TODAK_BASE_URL") {
            transport = transport.with_base_url(&base)?;
        }
        transport.session_cookie = env::var("TODAK_SESSION_COOKIE").ok();
        Ok(transport)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
            session_cookie: None,
        }
    }

    /// Base URL that relative targets (`/api/...`) are joined onto.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {e}"),
                ErrorContext::new()
                    .with_field_path("TODAK_BASE_URL")
                    .with_details(base.to_string())
                    .with_source("http_transport"),
            )
        })?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    fn resolve_url(&self, request: &OutboundRequest) -> std::result::Result<Url, TransportError> {
        let invalid = |reason: String| TransportError::InvalidUrl {
            url: request.url.clone(),
            reason,
        };
        match (&self.base_url, request.is_relative()) {
            (Some(base), true) => base.join(&request.url).map_err(|e| invalid(e.to_string())),
            (None, true) => Err(invalid("relative URL without a configured base".into())),
            (_, false) => Url::parse(&request.url).map_err(|e| invalid(e.to_string())),
        }
    }

    /// The session cookie belongs to the base origin, so it only ever goes
    /// there. An unset mode behaves as `same-origin`.
    fn attaches_cookie(&self, request: &OutboundRequest, url: &Url) -> bool {
        let same_origin = self
            .base_url
            .as_ref()
            .is_some_and(|base| base.origin() == url.origin());
        match request.credentials.unwrap_or(Credentials::SameOrigin) {
            Credentials::Omit => false,
            Credentials::SameOrigin | Credentials::Include => same_origin,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> std::result::Result<TransportResponse, TransportError> {
        let url = self.resolve_url(request)?;
        let with_cookie = self.attaches_cookie(request, &url);
        let mut req = self.client.request(request.method.clone(), url);

        for (k, v) in &request.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| TransportError::Other(format!("invalid header name '{k}': {e}")))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| TransportError::Other(format!("invalid header value for '{k}': {e}")))?;
            req = req.header(name, value);
        }

        if with_cookie {
            if let Some(cookie) = &self.session_cookie {
                req = req.header(COOKIE, cookie);
            }
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let resp = req.send().await?;
        Ok(TransportResponse::from_reqwest(resp))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}
