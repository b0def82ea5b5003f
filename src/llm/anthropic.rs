use super::{ensure_success, ChatModel, GenerationParams};
use crate::config::LlmProvider;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, params: GenerationParams) -> Self {
        AnthropicClient {
            api_key,
            model,
            params,
            client: reqwest::Client::new(),
        }
    }

    fn request<'a>(&'a self, system_prompt: &'a str, user_prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: user_prompt,
            }],
        }
    }
}

impl ChatModel for AnthropicClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request(system_prompt, user_prompt))
            .send()
            .await?;
        let response = ensure_success(LlmProvider::Anthropic, response).await?;

        let response_data: MessagesResponse = response.json().await?;
        response_data.into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    fn into_text(self) -> Result<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(anyhow!("No text in Anthropic response"));
        }
        Ok(text)
    }
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
