use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

/// Returned in place of a completion when no API key is configured.
pub const MISSING_KEY_PLACEHOLDER: &str =
    "This is a mock response (API key missing). Set LLM_API_KEY to enable real completions.";

/// Returned in place of a completion when the provider call fails.
pub const ERROR_PLACEHOLDER: &str = "Sorry, I encountered an error processing your request.";

pub const DEFAULT_BASE_URL: &str = "https://chatapi.akash.network/api/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text produced by a [`CompletionOracle`].
///
/// `degraded` is set when `text` is a placeholder rather than model output,
/// so downstream consumers never have to guess from the wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub degraded: bool,
}

impl Completion {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: false,
        }
    }

    pub fn degraded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: true,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Anything that turns a conversation into generated text.
///
/// Implementations never fail: an unavailable backend yields a degraded
/// placeholder so the caller can still answer the user.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Completion;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint
/// (AkashML, OpenRouter, a local gateway, ...).
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl OpenAiCompatClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("researcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build completion HTTP client")?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    async fn request(&self, api_key: &str, messages: &[ChatMessage]) -> Result<String> {
        let payload = json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("completion provider error ({status}): {body}");
        }

        let body: serde_json::Value = response.json().await?;
        parse_chat_completion(&body)
            .with_context(|| format!("completion response missing choices[0].message.content: {body}"))
    }
}

#[async_trait]
impl CompletionOracle for OpenAiCompatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Completion {
        let Some(api_key) = self.api_key() else {
            warn!("LLM API key is not set; returning mock response");
            return Completion::degraded(MISSING_KEY_PLACEHOLDER);
        };

        match self.request(api_key, messages).await {
            Ok(text) => {
                debug!(model = %self.settings.model, chars = text.len(), "completion received");
                Completion::generated(text)
            }
            Err(err) => {
                error!(error = %err, endpoint = %self.endpoint(), "error calling completion provider");
                Completion::degraded(ERROR_PLACEHOLDER)
            }
        }
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
pub fn parse_chat_completion(body: &serde_json::Value) -> Option<String> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(ToString::to_string)
}

// ── Insight extraction ───────────────────────────────────────────────────────

const EXTRACTION_SYSTEM_PROMPT: &str = "You are an expert researcher building a knowledge base.";

/// Messages asking the model to distil one reusable insight from a Q&A pair.
pub fn insight_extraction_messages(query: &str, answer: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        "Read the question and answer below and state one short \"key insight\" or rule of thumb \
         worth remembering for similar questions in the future.\n\n\
         Question: {query}\n\
         Answer: {answer}\n\n\
         Reply with the insight sentence only, without any preamble."
    );
    vec![ChatMessage::system(EXTRACTION_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

pub async fn extract_insight(oracle: &dyn CompletionOracle, query: &str, answer: &str) -> Completion {
    let mut completion = oracle
        .complete(&insight_extraction_messages(query, answer))
        .await;
    completion.text = completion.text.trim().to_string();
    completion
}

// ── Tests ────────────────────────────────────────────────────────────────────
