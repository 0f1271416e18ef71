use std::time::Duration;

use reqwest::StatusCode as HttpStatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::Config;

pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Groq,
    OpenAi,
}

impl LlmProvider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
    #[error("{0} is not configured")]
    MissingApiKey(&'static str),
    #[error("Failed to build LLM HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Failed to call {provider} API: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: HttpStatusCode,
        body: String,
    },
    #[error("{provider} response does not contain completion text")]
    EmptyCompletion { provider: &'static str },
}

/// A single-turn chat completion request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: Option<&'a str>,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Overrides the client's default model.
    pub model: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    provider: LlmProvider,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(
        provider: LlmProvider,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS))
            .build()
            .map_err(LlmError::Client)?;

        Ok(Self {
            http,
            provider,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatCompletion, LlmError> {
        let provider = self.provider.as_str();
        let model = request.model.unwrap_or(&self.model);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let request_body = json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false
        });

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(provider, model, "Sending chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|source| LlmError::Transport { provider, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| LlmError::Transport { provider, source })?;

        if !status.is_success() {
            return Err(LlmError::Api {
                provider,
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let raw_response: Value =
            serde_json::from_str(&body).unwrap_or_else(|_| json!({ "raw_body": body }));

        let content = raw_response
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion { provider })?;

        let model_used = raw_response
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(ChatCompletion {
            content: content.to_string(),
            model: model_used,
        })
    }
}

/// Configured chat clients, one per provider with an API key.
#[derive(Debug, Clone, Default)]
pub struct LlmClients {
    groq: Option<ChatClient>,
    openai: Option<ChatClient>,
}

impl LlmClients {
    pub fn new(groq: Option<ChatClient>, openai: Option<ChatClient>) -> Self {
        Self { groq, openai }
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let groq = config
            .groq_api_key
            .as_ref()
            .map(|key| {
                ChatClient::new(
                    LlmProvider::Groq,
                    key,
                    &config.groq_api_url,
                    &config.groq_model,
                )
            })
            .transpose()?;
        let openai = config
            .openai_api_key
            .as_ref()
            .map(|key| {
                ChatClient::new(
                    LlmProvider::OpenAi,
                    key,
                    &config.openai_api_url,
                    &config.openai_model,
                )
            })
            .transpose()?;

        Ok(Self { groq, openai })
    }

    /// Resolve a client by provider name as sent by API callers.
    pub fn get(&self, provider: &str) -> Result<&ChatClient, LlmError> {
        let parsed = LlmProvider::parse(provider)
            .ok_or_else(|| LlmError::UnsupportedProvider(provider.to_string()))?;
        let client = match parsed {
            LlmProvider::Groq => self.groq.as_ref(),
            LlmProvider::OpenAi => self.openai.as_ref(),
        };
        client.ok_or(LlmError::MissingApiKey(parsed.api_key_env()))
    }

    pub fn is_available(&self, provider: LlmProvider) -> bool {
        match provider {
            LlmProvider::Groq => self.groq.is_some(),
            LlmProvider::OpenAi => self.openai.is_some(),
        }
    }

    pub fn any_available(&self) -> bool {
        self.groq.is_some() || self.openai.is_some()
    }
}
