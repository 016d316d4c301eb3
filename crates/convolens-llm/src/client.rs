use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::usage::UsageMeter;

const MAX_PROMPT_LOG_CHARS: usize = 4_000;

/// Message role in a chat exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of an accumulated conversation passed verbatim on each call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat-completion errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Chat-completion client trait
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn], max_tokens: u32) -> Result<String, LlmError>;
}

#[async_trait]
impl ChatClient for Arc<dyn ChatClient> {
    async fn complete(&self, turns: &[ChatTurn], max_tokens: u32) -> Result<String, LlmError> {
        (**self).complete(turns, max_tokens).await
    }
}

/// HTTP client config (OpenAI-compatible)
#[derive(Debug, Clone)]
pub struct HttpChatClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for HttpChatClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "deepseek-chat".to_string(),
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

/// HTTP chat client using an OpenAI-compatible API. Token usage reported by
/// the service is recorded on the injected `UsageMeter`.
pub struct HttpChatClient {
    client: reqwest::Client,
    config: HttpChatClientConfig,
    usage: Arc<UsageMeter>,
}

impl HttpChatClient {
    pub fn new(config: HttpChatClientConfig, usage: Arc<UsageMeter>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self {
            client,
            config,
            usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, turns: &[ChatTurn], max_tokens: u32) -> Result<String, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| LlmError::Http(e.to_string()))?,
            );
        }

        let body = ChatRequest {
            model: &self.config.model,
            messages: turns
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            temperature: self.config.temperature,
            max_tokens,
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Some(last) = turns.last() {
                debug!(
                    turn_count = turns.len(),
                    prompt = %truncate_for_log(&last.content, MAX_PROMPT_LOG_CHARS),
                    "chat request prepared"
                );
            }
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Response(format!("HTTP {}: {}", status, text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Serialization(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            self.usage
                .record(usage.prompt_tokens, usage.completion_tokens);
        }

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| LlmError::Response("missing choices".to_string()))?;

        Ok(content)
    }
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}

enum MockBehavior {
    /// Responses popped in order; erroring once the script runs out.
    Script(VecDeque<String>),
    /// The same response on every call.
    Always(String),
    /// Every call fails, simulating an unreachable service.
    Unreachable(String),
}

/// Mock chat client for tests
pub struct MockChatClient {
    behavior: Mutex<MockBehavior>,
    calls: AtomicUsize,
}

impl MockChatClient {
    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            behavior: Mutex::new(MockBehavior::Script(
                responses.into_iter().map(String::from).collect(),
            )),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(response: &str) -> Self {
        Self {
            behavior: Mutex::new(MockBehavior::Always(response.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            behavior: Mutex::new(MockBehavior::Unreachable(message.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, _turns: &[ChatTurn], _max_tokens: u32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut behavior = self.behavior.lock().expect("mock behavior lock");
        match &mut *behavior {
            MockBehavior::Script(responses) => responses
                .pop_front()
                .ok_or_else(|| LlmError::Response("mock script exhausted".to_string())),
            MockBehavior::Always(response) => Ok(response.clone()),
            MockBehavior::Unreachable(message) => Err(LlmError::Http(message.clone())),
        }
    }
}
