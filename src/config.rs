// src/config.rs
use anyhow::{Context, Result};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PROVIDER: &str = "gemini";

/// Process configuration, read from the environment once at startup and
/// immutable thereafter. Passed into Rocket as managed state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm_provider: String,
    pub llm_api_key: Option<String>,
    pub llm_model_name: Option<String>,
    pub webhook_secret: Option<String>,
    pub allowed_origins: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let llm_provider = env_opt("LLM_PROVIDER")
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
            .to_lowercase();

        // LLM_API_KEY wins; otherwise fall back to the active provider's
        // own variable.
        let llm_api_key =
            env_opt("LLM_API_KEY").or_else(|| api_key_var(&llm_provider).and_then(env_opt));

        let port = match env_opt("ROCKET_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .context("ROCKET_PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let config = Self {
            llm_provider,
            llm_api_key,
            llm_model_name: env_opt("LLM_MODEL_NAME"),
            webhook_secret: env_opt("WEBHOOK_SECRET"),
            allowed_origins: env_opt("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()),
            port,
        };

        info!("LLM provider: {}", config.llm_provider);
        if config.llm_api_key.is_none() {
            warn!(
                "No API key configured for provider {}; analysis will return a placeholder",
                config.llm_provider
            );
        }
        if config.webhook_secret.is_none() {
            warn!("WEBHOOK_SECRET not set; inbound signature verification is disabled");
        }

        Ok(config)
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Environment variable holding a provider's own API key, tolerant of
/// provider-name casing like the adapter factory is.
fn api_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        "gemini" => Some("GEMINI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_var_ignores_provider_casing() {
        assert_eq!(api_key_var("OpenAI"), Some("OPENAI_API_KEY"));
        assert_eq!(api_key_var("GEMINI"), Some("GEMINI_API_KEY"));
        assert_eq!(api_key_var("anthropic"), Some("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_unknown_provider_has_no_key_var() {
        assert_eq!(api_key_var("cohere"), None);
    }
}
