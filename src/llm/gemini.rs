use super::{ensure_success, ChatModel, GenerationParams};
use crate::config::LlmProvider;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: String, base_url: String, model: String, params: GenerationParams) -> Self {
        GeminiClient {
            api_key,
            base_url,
            model,
            params,
            client: reqwest::Client::new(),
        }
    }

    fn generate_url(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn request<'a>(&self, system_prompt: &'a str, user_prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content::new(system_prompt, None),
            contents: vec![Content::new(user_prompt, Some("user"))],
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_tokens,
                response_mime_type: "application/json",
            },
        }
    }
}

impl ChatModel for GeminiClient {
    /// Generate text using the configured Gemini model
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = self.request(system_prompt, user_prompt);

        let response = self
            .client
            .post(self.generate_url())
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(LlmProvider::Gemini, response).await?;

        let response_data: GenerateResponse = response.json().await?;
        response_data.into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
}

impl<'a> Content<'a> {
    fn new(text: &'a str, role: Option<&'static str>) -> Self {
        Content {
            parts: vec![Part { text }],
            role,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No response generated"))?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        if text.trim().is_empty() {
            return Err(anyhow!("Gemini returned an empty response"));
        }
        Ok(text)
    }
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}
