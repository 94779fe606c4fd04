//! 요청 게이트웨이: 중복 요청 병합, 지터 백오프 재시도, 짧은 응답 캐시.
//!
//! # Resilient Fetch Gateway
//!
//! Every HTTP call the application makes goes through [`FetchGateway::fetch`],
//! which applies one uniform policy:
//!
//! 1. **Short cache**: URL targets accepted by the [`EndpointMatcher`] (by
//!    default anything containing `/api/me`) are answered from memory while
//!    their entry is younger than its TTL (1500 ms unless overridden).
//! 2. **Deduplication**: concurrent calls with the same [`RequestSignature`]
//!    share one network call and receive the same [`CachedResponse`]. Calls
//!    carrying a cancellation token never share.
//! 3. **Retry**: HTTP 429 backs off `min(1000·2ⁿ, 5000) + [0,300)` ms;
//!    transport failures wait `500 + [0,400)` ms. After four retries a 429 is
//!    returned as a value while a transport failure is raised.
//!
//! ```rust,no_run
//! use todak_fetch::{FetchGateway, FetchOptions};
//!
//! # async fn run() -> todak_fetch::Result<()> {
//! let gateway = FetchGateway::from_env()?;
//! let me = gateway.get("/api/me").await?;
//! if me.ok() {
//!     let profile: Option<serde_json::Value> = me.json();
//!     println!("{profile:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod inflight;
mod matcher;
mod options;
mod response;
mod retry;
mod short_cache;
mod signature;

pub use matcher::{EndpointMatcher, IDENTITY_ENDPOINT};
pub use options::{FetchOptions, RequestDescriptor, RequestTarget};
pub use response::CachedResponse;
pub use retry::RetryPolicy;
pub use signature::RequestSignature;

use crate::config::GatewayConfig;
use crate::transport::{HttpTransport, OutboundRequest, Transport, TransportError};
use crate::{Error, Result};
use futures::FutureExt;
use inflight::{InFlightRegistry, Slot};
use reqwest::StatusCode;
use short_cache::ShortCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Counters describing what the gateway has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Calls made to the transport, retries included.
    pub network_attempts: u64,
    /// Callers that joined an already pending request.
    pub dedup_joins: u64,
    pub cache_hits: u64,
    pub rate_limit_retries: u64,
    pub transport_retries: u64,
}

#[derive(Default)]
struct AtomicStats {
    network_attempts: AtomicU64,
    dedup_joins: AtomicU64,
    cache_hits: AtomicU64,
    rate_limit_retries: AtomicU64,
    transport_retries: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> GatewayStats {
        GatewayStats {
            network_attempts: self.network_attempts.load(Ordering::Relaxed),
            dedup_joins: self.dedup_joins.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            rate_limit_retries: self.rate_limit_retries.load(Ordering::Relaxed),
            transport_retries: self.transport_retries.load(Ordering::Relaxed),
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    config: GatewayConfig,
    matcher: EndpointMatcher,
    in_flight: InFlightRegistry,
    cache: ShortCache,
    stats: AtomicStats,
}

/// Cheaply clonable handle; clones share registry, cache and counters.
#[derive(Clone)]
pub struct FetchGateway {
    inner: Arc<Inner>,
}

impl FetchGateway {
    /// Gateway with default policy over the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::from_parts(transport, GatewayConfig::default(), EndpointMatcher::default())
    }

    /// `HttpTransport::from_env` + `GatewayConfig::from_env`.
    pub fn from_env() -> Result<Self> {
        FetchGatewayBuilder::new()
            .config(GatewayConfig::from_env()?)
            .build()
    }

    pub fn builder() -> FetchGatewayBuilder {
        FetchGatewayBuilder::new()
    }

    fn from_parts(
        transport: Arc<dyn Transport>,
        config: GatewayConfig,
        matcher: EndpointMatcher,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                matcher,
                in_flight: InFlightRegistry::default(),
                cache: ShortCache::default(),
                stats: AtomicStats::default(),
            }),
        }
    }

    /// Fetch with options omitted.
    pub async fn get(&self, target: impl Into<RequestTarget>) -> Result<CachedResponse> {
        self.dispatch(target.into(), None).await
    }

    /// Fetch `target` applying cache, dedup and retry policy.
    ///
    /// HTTP error statuses come back as responses with `ok() == false`. Errors
    /// are limited to exhausted transport failures and caller cancellation.
    pub async fn fetch(
        &self,
        target: impl Into<RequestTarget>,
        options: FetchOptions,
    ) -> Result<CachedResponse> {
        self.dispatch(target.into(), Some(options)).await
    }

    async fn dispatch(
        &self,
        target: RequestTarget,
        options: Option<FetchOptions>,
    ) -> Result<CachedResponse> {
        let key = RequestSignature::derive(&target, options.as_ref());

        let cache_ttl = target
            .as_url()
            .filter(|url| self.inner.matcher.matches(url))
            .map(|_| {
                options
                    .as_ref()
                    .and_then(|o| o.cache_ttl)
                    .filter(|ttl| !ttl.is_zero())
                    .unwrap_or_else(|| self.inner.config.default_cache_ttl())
            });

        if cache_ttl.is_some() {
            if let Some(hit) = self.inner.cache.get(&key) {
                self.inner.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(signature = %key, "short cache hit");
                return Ok(hit);
            }
        }

        let cancel = options.as_ref().and_then(|o| o.cancel.clone());
        let request = target.into_outbound(options.as_ref());

        if let Some(token) = cancel {
            // Cancellable callers own their lifecycle: never registered, never joined.
            return tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(signature = %key, "request cancelled by caller");
                    Err(Error::Cancelled)
                }
                outcome = self.inner.execute(&request, &key, cache_ttl) => outcome.map_err(Error::from),
            };
        }

        let slot = self.inner.in_flight.join_or_start(&key, || {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            async move {
                let outcome = inner.execute(&request, &key, cache_ttl).await;
                inner.in_flight.remove(&key);
                outcome
            }
            .boxed()
            .shared()
        });

        let outcome = match slot {
            Slot::Joined(outcome) => {
                self.inner.stats.dedup_joins.fetch_add(1, Ordering::Relaxed);
                debug!(signature = %key, "joined in-flight request");
                outcome
            }
            Slot::Leader(outcome) => {
                // Drive to settlement even if every caller goes away, so the
                // registry entry is always cleared.
                tokio::spawn(outcome.clone());
                outcome
            }
        };

        outcome.await.map_err(Error::from)
    }

    /// Number of signatures with a request currently in flight.
    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn stats(&self) -> GatewayStats {
        self.inner.stats.to_stats()
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }
}

impl Inner {
    async fn execute(
        &self,
        request: &OutboundRequest,
        key: &RequestSignature,
        cache_ttl: Option<Duration>,
    ) -> std::result::Result<CachedResponse, TransportError> {
        let policy = &self.config.retry;
        let mut attempt: u32 = 0;

        loop {
            self.stats.network_attempts.fetch_add(1, Ordering::Relaxed);
            debug!(method = %request.method, url = %request.url, attempt, "sending request");

            let outcome = match self.transport.send(request).await {
                Ok(resp)
                    if resp.status() == StatusCode::TOO_MANY_REQUESTS
                        && attempt < policy.max_retries =>
                {
                    let delay = policy.rate_limit_delay(attempt);
                    warn!(
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    self.stats.rate_limit_retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Ok(resp) => resp.into_parts().await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok((status, headers, body)) => {
                    let response = CachedResponse::new(status, headers, body);
                    if let Some(ttl) = cache_ttl {
                        self.cache.insert(key.clone(), response.clone(), ttl);
                    }
                    return Ok(response);
                }
                Err(e) if attempt < policy.max_retries => {
                    let delay = policy.transport_delay();
                    warn!(
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transport failure, retrying"
                    );
                    self.stats.transport_retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Builder for [`FetchGateway`].
#[derive(Default)]
pub struct FetchGatewayBuilder {
    transport: Option<Arc<dyn Transport>>,
    config: Option<GatewayConfig>,
    matcher: Option<EndpointMatcher>,
}

impl FetchGatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport to drive. Defaults to [`HttpTransport::from_env`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the matcher derived from the config.
    pub fn cache_matcher(mut self, matcher: EndpointMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn build(self) -> Result<FetchGateway> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let matcher = match self.matcher {
            Some(m) => m,
            None => config.matcher()?,
        };
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::from_env()?),
        };
        Ok(FetchGateway::from_parts(transport, config, matcher))
    }
}
