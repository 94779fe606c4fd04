//! Request signature derivation.

use super::options::{FetchOptions, RequestTarget};

/// Deterministic key shared by logically identical requests. Used both for
/// in-flight deduplication and for the short cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// `url + "::" + json(options)` for URL targets (empty suffix when options
    /// are omitted). Descriptor targets use their JSON form, falling back to
    /// their display form; options are appended the same way when given,
    /// since they override the descriptor on the wire.
    pub fn derive(target: &RequestTarget, options: Option<&FetchOptions>) -> Self {
        let suffix = options.map(|o| serde_json::to_string(o).unwrap_or_default());
        match target {
            RequestTarget::Url(url) => Self(format!("{url}::{}", suffix.unwrap_or_default())),
            RequestTarget::Request(desc) => {
                let base = serde_json::to_string(desc).unwrap_or_else(|_| desc.to_string());
                match suffix {
                    Some(suffix) => Self(format!("{base}::{suffix}")),
                    None => Self(base),
                }
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestSignature {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RequestSignature {
    fn from(s: String) -> Self {
        Self(s)
    }
}
