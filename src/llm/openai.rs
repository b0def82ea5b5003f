use super::{ensure_success, ChatModel, GenerationParams};
use crate::config::LlmProvider;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for the OpenAI chat completions API
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, params: GenerationParams) -> Self {
        OpenAiClient {
            api_key,
            model,
            params,
            client: reqwest::Client::new(),
        }
    }

    fn request<'a>(&'a self, system_prompt: &'a str, user_prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

impl ChatModel for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&self.request(system_prompt, user_prompt))
            .send()
            .await?;
        let response = ensure_success(LlmProvider::OpenAi, response).await?;

        let response_data: ChatResponse = response.json().await?;
        response_data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow!("No response generated"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::OpenAi
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}
