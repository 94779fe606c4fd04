use super::color::{parse_color_hint, strip_color_hint, strip_fragment};
use super::message::{ChatMessage, StoredMessage};
use crate::gateway::{CachedResponse, FetchGateway, FetchOptions};
use crate::transport::Credentials;
use crate::{Error, ErrorContext, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

/// Persona prompt for OpenAI-compatible completions. Asks for a trailing
/// color fragment that [`parse_color_hint`] understands.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
너에게 3가지 역할을 줄께

1️⃣ 현재 사용자의 감정에 가장 어울리는 색상을 사용자에게 알려주고,
사용자의 감정에 따라 조언이나 위로 혹은 응원도 해줬으면 좋겠어.

2️⃣ 다정하고 친근하게 말해줘!

3️⃣ (사용자가 볼 수 없게) 대화의 끝에 현재 사용자의 감정에 가장 어울리는 색상을 JSON으로 출력해 줘.
만약 사용자의 대화에 감정과 관련이 없다면 생략해도 돼.
JSON은 이렇게 출력하면 돼!
{\"color\": \"#ffffff\"}";

pub const DEFAULT_CHAT_PATH: &str = "/api/ai/chat";
pub const DEFAULT_HISTORY_PATH: &str = "/api/ai/history";
pub const DEFAULT_COMPLETIONS_MODEL: &str = "gpt-3.5-turbo";

const MSG_LOGIN_REQUIRED: &str = "로그인이 필요합니다. 로그인 후 다시 시도해 주세요.";
const MSG_GENERATION_FAILED: &str = "답변 생성에 실패했습니다. 잠시 후 다시 시도해 주세요.";
const MSG_NETWORK: &str = "네트워크 오류가 발생했습니다.";

/// Direct OpenAI-compatible endpoint, used instead of the app backend.
#[derive(Debug, Clone)]
pub struct CompletionsConfig {
    /// Full URL of `/v1/chat/completions` (or a relative path on the base URL).
    pub url: String,
    pub model: String,
    pub system_prompt: Option<String>,
    /// Sent as `Authorization: Bearer ...` to this endpoint only.
    pub api_key: Option<String>,
}

impl CompletionsConfig {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            api_key: None,
        }
    }

    /// `TODAK_COMPLETIONS_URL` (required), `TODAK_COMPLETIONS_MODEL`
    /// (default `gpt-3.5-turbo`) and `TODAK_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("TODAK_COMPLETIONS_URL").map_err(|_| {
            Error::configuration_with_context(
                "TODAK_COMPLETIONS_URL is not set",
                ErrorContext::new()
                    .with_field_path("TODAK_COMPLETIONS_URL")
                    .with_source("completions_config"),
            )
        })?;
        let model = std::env::var("TODAK_COMPLETIONS_MODEL")
            .unwrap_or_else(|_| DEFAULT_COMPLETIONS_MODEL.to_string());
        let mut config = Self::new(url, model);
        config.api_key = std::env::var("TODAK_API_KEY").ok();
        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn without_system_prompt(mut self) -> Self {
        self.system_prompt = None;
        self
    }
}

/// Assistant reply split into what the user sees and the hidden color hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub color: Option<String>,
    pub raw: String,
}

impl AssistantReply {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let hint = parse_color_hint(&raw);
        Self {
            text: strip_fragment(&raw, &hint),
            color: hint.color().map(str::to_string),
            raw,
        }
    }
}

/// Chat transcript client over a [`FetchGateway`].
#[derive(Clone)]
pub struct ChatClient {
    gateway: FetchGateway,
    chat_path: String,
    history_path: String,
    completions: Option<CompletionsConfig>,
}

impl ChatClient {
    pub fn new(gateway: FetchGateway) -> Self {
        Self {
            gateway,
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            history_path: DEFAULT_HISTORY_PATH.to_string(),
            completions: None,
        }
    }

    pub fn with_paths(mut self, chat: impl Into<String>, history: impl Into<String>) -> Self {
        self.chat_path = chat.into();
        self.history_path = history.into();
        self
    }

    pub fn with_completions(mut self, config: CompletionsConfig) -> Self {
        self.completions = Some(config);
        self
    }

    /// Send the whole conversation to the backend and return its reply.
    pub async fn send(&self, history: &[ChatMessage]) -> Result<AssistantReply> {
        let options = FetchOptions::new()
            .method(Method::POST)
            .credentials(Credentials::Include)
            .json(&json!({ "messages": history }))?;

        let resp = self.gateway.fetch(self.chat_path.as_str(), options).await?;
        if !resp.ok() {
            return Err(remote_error(&resp));
        }

        let body = resp.json_value().unwrap_or(Value::Null);
        let content = body.get("content").and_then(Value::as_str).unwrap_or_default();
        debug!(len = content.len(), "chat reply received");
        Ok(AssistantReply::from_raw(content))
    }

    /// Ask an OpenAI-compatible completions endpoint directly.
    pub async fn complete(&self, history: &[ChatMessage]) -> Result<AssistantReply> {
        let cfg = self.completions.as_ref().ok_or_else(|| {
            Error::configuration_with_context(
                "no completions endpoint configured",
                ErrorContext::new()
                    .with_field_path("completions")
                    .with_source("chat_client"),
            )
        })?;

        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &cfg.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }
        messages.extend_from_slice(history);

        // Third-party host: never the app session, only its own key.
        let mut options = FetchOptions::new()
            .method(Method::POST)
            .credentials(Credentials::Omit)
            .json(&json!({ "model": cfg.model, "messages": messages }))?;
        if let Some(key) = &cfg.api_key {
            options = options.header(AUTHORIZATION.as_str(), format!("Bearer {key}"));
        }

        let resp = self.gateway.fetch(cfg.url.as_str(), options).await?;
        if !resp.ok() {
            return Err(remote_error(&resp));
        }

        let body = resp.json_value().unwrap_or(Value::Null);
        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::validation_with_context(
                    "completion response has no message content",
                    ErrorContext::new()
                        .with_field_path("choices[0].message.content")
                        .with_source("chat_client"),
                )
            })?;
        Ok(AssistantReply::from_raw(content))
    }

    /// Stored transcript with color fragments removed. A non-ok response
    /// yields an empty history.
    pub async fn history(&self) -> Result<Vec<ChatMessage>> {
        let options = FetchOptions::new().credentials(Credentials::Include);
        let resp = self
            .gateway
            .fetch(self.history_path.as_str(), options)
            .await?;
        if !resp.ok() {
            debug!(status = resp.status().as_u16(), "history unavailable");
            return Ok(Vec::new());
        }

        let items: Vec<StoredMessage> = resp
            .json_value()
            .and_then(|v| match v {
                Value::Object(mut map) => map.remove("items"),
                _ => None,
            })
            .and_then(|items| serde_json::from_value(items).ok())
            .unwrap_or_default();

        Ok(items
            .iter()
            .map(|item| ChatMessage {
                role: item.role(),
                content: strip_color_hint(&item.content()),
            })
            .collect())
    }
}

fn remote_error(resp: &CachedResponse) -> Error {
    let status = resp.status();
    let message = resp
        .json_value()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Error::Remote {
        status: status.as_u16(),
        message,
    }
}

/// Message to show in the transcript when a chat call fails.
pub fn user_facing_message(err: &Error) -> String {
    match err {
        Error::Remote { status, .. } if *status == StatusCode::UNAUTHORIZED.as_u16() => {
            MSG_LOGIN_REQUIRED.to_string()
        }
        Error::Remote { message, .. } if !message.is_empty() => message.clone(),
        Error::Transport(_) => MSG_NETWORK.to_string(),
        _ => MSG_GENERATION_FAILED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn reply_is_split_into_text_and_color() {
        let reply = AssistantReply::from_raw("힘내요! {\"color\": \"#FFD93D\"}");
        assert_eq!(reply.text, "힘내요!");
        assert_eq!(reply.color.as_deref(), Some("#FFD93D"));
        assert!(reply.raw.ends_with('}'));
    }

    #[test]
    fn failures_map_to_transcript_messages() {
        let unauthorized = Error::Remote {
            status: 401,
            message: "Unauthorized".into(),
        };
        assert_eq!(user_facing_message(&unauthorized), MSG_LOGIN_REQUIRED);

        let quota = Error::Remote {
            status: 503,
            message: "잠시 후 다시 시도해 주세요".into(),
        };
        assert_eq!(user_facing_message(&quota), "잠시 후 다시 시도해 주세요");

        let network = Error::Transport(TransportError::Other("reset".into()));
        assert_eq!(user_facing_message(&network), MSG_NETWORK);
        assert_eq!(user_facing_message(&Error::Cancelled), MSG_GENERATION_FAILED);
    }
}
