//! # todak-fetch
//!
//! 토닥톡 서비스의 HTTP 게이트웨이: 중복 요청 병합, 재시도, 짧은 캐시.
//!
//! Resilient fetch layer for the Todaktalk diary/chat service. Every request the
//! application makes (identity lookups, streak counters, chat turns) passes
//! through one [`FetchGateway`] that deduplicates identical in-flight requests,
//! retries rate-limited and failed attempts with jittered backoff, and keeps a
//! very short cache for the hot identity endpoint.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use todak_fetch::chat::{ChatClient, ChatMessage};
//! use todak_fetch::FetchGateway;
//!
//! #[tokio::main]
//! async fn main() -> todak_fetch::Result<()> {
//!     let gateway = FetchGateway::from_env()?;
//!     let chat = ChatClient::new(gateway);
//!
//!     let reply = chat.send(&[ChatMessage::user("오늘 좀 지쳤어요")]).await?;
//!     println!("{} (mood color: {:?})", reply.text, reply.color);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`gateway`] | Dedup, retry/backoff, short cache, response snapshots |
//! | [`transport`] | One-shot HTTP primitive and its `reqwest` implementation |
//! | [`chat`] | Chat messages, color-hint parsing, chat client |
//! | [`emotion`] | Emotion palette, contrast colors, hint-color names and gradients |
//! | [`config`] | Gateway configuration from defaults, env and YAML |

pub mod chat;
pub mod config;
pub mod emotion;
pub mod gateway;
pub mod transport;

pub use config::GatewayConfig;
pub use gateway::{
    CachedResponse, EndpointMatcher, FetchGateway, FetchGatewayBuilder, FetchOptions,
    GatewayStats, RequestDescriptor, RequestSignature, RequestTarget, RetryPolicy,
};
pub use transport::{Credentials, HttpTransport, Transport, TransportError};
pub use tokio_util::sync::CancellationToken;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
