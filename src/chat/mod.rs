//! 대화 모듈: 역할별 메시지, 색상 힌트 파서, 게이트웨이 기반 채팅 클라이언트.
//!
//! # Chat
//!
//! The assistant answers in free text and may hide a `{"color": "#rrggbb"}`
//! fragment describing the user's mood. [`parse_color_hint`] finds it,
//! [`AssistantReply`] separates it from the visible text, and [`ChatClient`]
//! carries conversations through the [`crate::FetchGateway`].

mod client;
mod color;
mod message;

pub use client::{
    user_facing_message, AssistantReply, ChatClient, CompletionsConfig, DEFAULT_CHAT_PATH,
    DEFAULT_COMPLETIONS_MODEL, DEFAULT_HISTORY_PATH, DEFAULT_SYSTEM_PROMPT,
};
pub use color::{parse_color_hint, strip_color_hint, ColorHint};
pub use message::{ChatMessage, ChatRole};
