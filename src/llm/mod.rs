//! Hosted chat models used for the single generation call.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::config::{LlmProvider, Settings};
use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// A model that answers one system + user prompt pair with text.
///
/// Implementations may write `async fn complete`; the returned future must be
/// `Send` so generic axum handlers can hold it.
pub trait ChatModel: Send + Sync {
    fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    fn model_name(&self) -> &str;

    fn provider(&self) -> LlmProvider;
}

/// Sampling parameters shared by every provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn from_settings(settings: &Settings) -> Self {
        GenerationParams {
            temperature: settings.llm_temperature,
            max_tokens: settings.llm_max_tokens,
        }
    }
}

/// Model a client may request per generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ModelChoice {
    #[serde(rename = "claude-3.5-sonnet")]
    #[value(name = "claude-3.5-sonnet")]
    Claude35Sonnet,
    #[serde(rename = "gpt-4o")]
    #[value(name = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-3.5-turbo")]
    #[value(name = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gemini-2.0-flash")]
    #[value(name = "gemini-2.0-flash")]
    Gemini20Flash,
}

impl ModelChoice {
    pub fn provider(&self) -> LlmProvider {
        match self {
            ModelChoice::Claude35Sonnet => LlmProvider::Anthropic,
            ModelChoice::Gpt4o | ModelChoice::Gpt35Turbo => LlmProvider::OpenAi,
            ModelChoice::Gemini20Flash => LlmProvider::Gemini,
        }
    }

    /// Provider-side model identifier
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelChoice::Claude35Sonnet => "claude-3-5-sonnet-20241022",
            ModelChoice::Gpt4o => "gpt-4o",
            ModelChoice::Gpt35Turbo => "gpt-3.5-turbo",
            ModelChoice::Gemini20Flash => "gemini-2.0-flash",
        }
    }
}

/// Any of the supported providers behind one type
#[derive(Clone)]
pub enum LlmClient {
    Gemini(GeminiClient),
    Anthropic(AnthropicClient),
    OpenAi(OpenAiClient),
}

impl LlmClient {
    /// Client for the configured default provider and model
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider = settings.default_provider;
        Self::for_provider(provider, settings.model_for(provider), settings)
    }

    /// Client for a model requested by the caller
    pub fn for_choice(choice: ModelChoice, settings: &Settings) -> Result<Self> {
        Self::for_provider(choice.provider(), choice.model_id(), settings)
    }

    pub fn for_provider(provider: LlmProvider, model: &str, settings: &Settings) -> Result<Self> {
        let api_key = settings
            .api_key(provider)
            .ok_or_else(|| anyhow!("No API key configured for provider {}", provider))?
            .to_string();
        let params = GenerationParams::from_settings(settings);
        let model = model.to_string();

        Ok(match provider {
            LlmProvider::Gemini => LlmClient::Gemini(GeminiClient::new(
                api_key,
                settings.gemini_base_url.clone(),
                model,
                params,
            )),
            LlmProvider::Anthropic => {
                LlmClient::Anthropic(AnthropicClient::new(api_key, model, params))
            }
            LlmProvider::OpenAi => LlmClient::OpenAi(OpenAiClient::new(api_key, model, params)),
        })
    }
}

impl ChatModel for LlmClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        match self {
            LlmClient::Gemini(client) => client.complete(system_prompt, user_prompt).await,
            LlmClient::Anthropic(client) => client.complete(system_prompt, user_prompt).await,
            LlmClient::OpenAi(client) => client.complete(system_prompt, user_prompt).await,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            LlmClient::Gemini(client) => client.model_name(),
            LlmClient::Anthropic(client) => client.model_name(),
            LlmClient::OpenAi(client) => client.model_name(),
        }
    }

    fn provider(&self) -> LlmProvider {
        match self {
            LlmClient::Gemini(_) => LlmProvider::Gemini,
            LlmClient::Anthropic(_) => LlmProvider::Anthropic,
            LlmClient::OpenAi(_) => LlmProvider::OpenAi,
        }
    }
}

/// Turn a non-success provider response into an error carrying status and body
pub(crate) async fn ensure_success(
    provider: LlmProvider,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow!(
        "{} API request failed: {} {}",
        provider,
        status,
        error_text
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(pairs: &[(&str, &str)]) -> Settings {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_model_choice_names() {
        let choice: ModelChoice = serde_json::from_str("\"claude-3.5-sonnet\"").unwrap();
        assert_eq!(choice, ModelChoice::Claude35Sonnet);
        assert_eq!(choice.provider(), LlmProvider::Anthropic);

        let choice: ModelChoice = serde_json::from_str("\"gpt-3.5-turbo\"").unwrap();
        assert_eq!(choice.provider(), LlmProvider::OpenAi);
        assert_eq!(choice.model_id(), "gpt-3.5-turbo");

        assert!(serde_json::from_str::<ModelChoice>("\"llama-3\"").is_err());
    }

    #[test]
    fn test_default_client_uses_configured_provider() {
        let settings = settings_with(&[("GEMINI_API_KEY", "g-key")]);
        let client = LlmClient::from_settings(&settings).unwrap();
        assert_eq!(client.provider(), LlmProvider::Gemini);
        assert_eq!(client.model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn test_choice_without_key_fails() {
        let settings = settings_with(&[("GEMINI_API_KEY", "g-key")]);
        let err = LlmClient::for_choice(ModelChoice::Gpt4o, &settings)
            .err()
            .unwrap();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_choice_with_key() {
        let settings = settings_with(&[("ANTHROPIC_API_KEY", "a-key")]);
        let client = LlmClient::for_choice(ModelChoice::Claude35Sonnet, &settings).unwrap();
        assert_eq!(client.provider(), LlmProvider::Anthropic);
        assert_eq!(client.model_name(), "claude-3-5-sonnet-20241022");
    }
}
