//! Cache eligibility predicate.

use crate::{Error, ErrorContext, Result};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// The "current identity" lookup hit on nearly every page load.
pub const IDENTITY_ENDPOINT: &str = "/api/me";

/// Decides which URL targets go through the short cache.
#[derive(Clone)]
pub enum EndpointMatcher {
    Never,
    Contains(String),
    Pattern(Regex),
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl EndpointMatcher {
    pub fn contains(substring: impl Into<String>) -> Self {
        EndpointMatcher::Contains(substring.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern).map(EndpointMatcher::Pattern).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid cache endpoint pattern: {e}"),
                ErrorContext::new()
                    .with_field_path("cache_pattern")
                    .with_details(pattern.to_string())
                    .with_source("endpoint_matcher"),
            )
        })
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        EndpointMatcher::Custom(Arc::new(f))
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            EndpointMatcher::Never => false,
            EndpointMatcher::Contains(s) => url.contains(s.as_str()),
            EndpointMatcher::Pattern(re) => re.is_match(url),
            EndpointMatcher::Custom(f) => f(url),
        }
    }
}

impl Default for EndpointMatcher {
    fn default() -> Self {
        EndpointMatcher::contains(IDENTITY_ENDPOINT)
    }
}

impl fmt::Debug for EndpointMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointMatcher::Never => write!(f, "Never"),
            EndpointMatcher::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            EndpointMatcher::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            EndpointMatcher::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_identity_lookups_only() {
        let m = EndpointMatcher::default();
        assert!(m.matches("/api/me"));
        assert!(m.matches("http://localhost:7780/api/me?fresh=1"));
        assert!(!m.matches("/api/user/streak"));
    }

    #[test]
    fn pattern_and_custom_matchers() {
        let m = EndpointMatcher::pattern(r"^/api/(me|profile)$").unwrap();
        assert!(m.matches("/api/profile"));
        assert!(!m.matches("/api/profile/update"));

        let m = EndpointMatcher::custom(|url| url.ends_with("/streak"));
        assert!(m.matches("/api/user/streak"));
        assert!(!EndpointMatcher::Never.matches("/api/me"));
    }

    #[test]
    fn invalid_pattern_is_a_configuration_error() {
        let err = EndpointMatcher::pattern("(").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
