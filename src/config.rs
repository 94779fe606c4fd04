//! Gateway configuration: defaults, environment overrides and YAML files.

use crate::gateway::{EndpointMatcher, RetryPolicy, IDENTITY_ENDPOINT};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Policy knobs for a [`crate::FetchGateway`].
///
/// ```yaml
/// retry:
///   max_retries: 4
///   jitter: true
/// cache_ttl_ms: 1500
/// cache_endpoint: /api/me
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub retry: RetryPolicy,
    /// TTL for short-cache entries when the call gives no override.
    pub cache_ttl_ms: u64,
    /// Substring selecting cache-eligible URLs. `None` disables the cache
    /// unless `cache_pattern` is set.
    pub cache_endpoint: Option<String>,
    /// Regex alternative to `cache_endpoint`; takes precedence when set.
    pub cache_pattern: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            cache_ttl_ms: 1500,
            cache_endpoint: Some(IDENTITY_ENDPOINT.to_string()),
            cache_pattern: None,
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TODAK_MAX_RETRIES`, `TODAK_CACHE_TTL_MS`,
    /// `TODAK_CACHE_ENDPOINT` and `TODAK_RETRY_JITTER`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(n) = env_parse::<u32>("TODAK_MAX_RETRIES")? {
            config.retry.max_retries = n;
        }
        if let Some(ms) = env_parse::<u64>("TODAK_CACHE_TTL_MS")? {
            config.cache_ttl_ms = ms;
        }
        if let Some(jitter) = env_parse::<bool>("TODAK_RETRY_JITTER")? {
            config.retry.jitter = jitter;
        }
        if let Ok(endpoint) = env::var("TODAK_CACHE_ENDPOINT") {
            config.cache_endpoint = (!endpoint.is_empty()).then_some(endpoint);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn with_cache_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.cache_endpoint = endpoint;
        self
    }

    pub fn default_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn matcher(&self) -> Result<EndpointMatcher> {
        match (&self.cache_pattern, &self.cache_endpoint) {
            (Some(pattern), _) => EndpointMatcher::pattern(pattern),
            (None, Some(endpoint)) => Ok(EndpointMatcher::contains(endpoint.clone())),
            (None, None) => Ok(EndpointMatcher::Never),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let retry = &self.retry;
        if retry.rate_limit_cap_ms < retry.rate_limit_base_ms {
            return Err(Error::configuration_with_context(
                "rate-limit cap is below the base delay",
                ErrorContext::new()
                    .with_field_path("retry.rate_limit_cap_ms")
                    .with_details(format!(
                        "cap={} base={}",
                        retry.rate_limit_cap_ms, retry.rate_limit_base_ms
                    ))
                    .with_source("gateway_config"),
            ));
        }
        if self.cache_ttl_ms == 0 {
            return Err(Error::configuration_with_context(
                "cache TTL must be positive",
                ErrorContext::new()
                    .with_field_path("cache_ttl_ms")
                    .with_source("gateway_config"),
            ));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot parse {key}: {e}"),
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(raw.clone())
                    .with_source("env"),
            )
        }),
        Err(_) => Ok(None),
    }
}
