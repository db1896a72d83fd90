// src/llm.rs
//
// One adapter per model vendor, all exposing the same generate contract so
// the rest of the pipeline stays provider-agnostic. Selection is a factory
// keyed by the configured provider name.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

const MAX_OUTPUT_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.3;
const CALL_TIMEOUT_SECS: u64 = 60;

const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";

#[derive(Debug, Error)]
pub enum ModelCallError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ModelCallError {
    fn from(e: reqwest::Error) -> Self {
        ModelCallError::Network(e.to_string())
    }
}

/// Provider-agnostic model invocation adapter.
#[derive(Debug)]
pub enum ModelAdapter {
    OpenAi(OpenAiAdapter),
    Gemini(GeminiAdapter),
    Anthropic(AnthropicAdapter),
}

impl ModelAdapter {
    /// Build the adapter for the named provider. An unrecognized provider is
    /// a construction error; a missing API key is not (generation then
    /// short-circuits to a placeholder message).
    pub fn new(provider: &str, api_key: Option<String>, model_name: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(CALL_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        match provider.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi(OpenAiAdapter {
                client,
                api_key,
                model: model_name.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            })),
            "gemini" => Ok(Self::Gemini(GeminiAdapter {
                client,
                api_key,
                model: model_name.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
            })),
            "anthropic" => Ok(Self::Anthropic(AnthropicAdapter {
                client,
                api_key,
                model: model_name.unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
            })),
            other => anyhow::bail!("Unsupported LLM provider: {}", other),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Gemini(_) => "gemini",
            Self::Anthropic(_) => "anthropic",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(a) => &a.model,
            Self::Gemini(a) => &a.model,
            Self::Anthropic(a) => &a.model,
        }
    }

    fn api_key(&self) -> Option<&str> {
        match self {
            Self::OpenAi(a) => a.api_key.as_deref(),
            Self::Gemini(a) => a.api_key.as_deref(),
            Self::Anthropic(a) => a.api_key.as_deref(),
        }
    }

    /// Generate text for a prompt, never failing at the type level.
    ///
    /// A missing API key or a failed vendor call both come back as readable
    /// text; downstream normalization is where a caller learns the response
    /// was not usable. Failures are still logged here so they can be told
    /// apart from a model that answered badly.
    pub async fn generate_text(&self, prompt: &str) -> String {
        if self.api_key().is_none() {
            return format!(
                "Please configure your {} API key to use AI analysis.",
                self.provider().to_uppercase()
            );
        }

        match self.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Model call to {} failed: {}", self.provider(), e);
                format!("Error calling {}: {}", self.provider(), e)
            }
        }
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, ModelCallError> {
        info!("Calling {} model {}", self.provider(), self.model());
        match self {
            Self::OpenAi(a) => a.generate(prompt).await,
            Self::Gemini(a) => a.generate(prompt).await,
            Self::Anthropic(a) => a.generate(prompt).await,
        }
    }
}

async fn read_error(response: reqwest::Response) -> ModelCallError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ModelCallError::Api { status, body }
}

#[derive(Debug)]
pub struct OpenAiAdapter {
    client: Client,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

impl OpenAiAdapter {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ModelCallError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": MAX_OUTPUT_TOKENS,
            "temperature": TEMPERATURE,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ModelCallError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ModelCallError::Parse("no choices in response".to_string()))
    }
}

#[derive(Debug)]
pub struct GeminiAdapter {
    client: Client,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

impl GeminiAdapter {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ModelCallError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "temperature": TEMPERATURE,
            },
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ModelCallError::Parse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ModelCallError::Parse("no candidates in response".to_string()))
    }
}

#[derive(Debug)]
pub struct AnthropicAdapter {
    client: Client,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

impl AnthropicAdapter {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ModelCallError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "temperature": TEMPERATURE,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ModelCallError::Parse(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ModelCallError::Parse("no content in response".to_string()))
    }
}
