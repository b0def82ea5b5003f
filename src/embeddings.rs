use crate::config::Settings;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Dimension of the vectors produced by the Gemini text embedding models
pub const EMBEDDING_DIMENSION: u64 = 768;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Embedding {
    pub values: Vec<f32>,
}

/// Client for the Gemini `embedContent` endpoint
#[derive(Clone)]
pub struct EmbeddingClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl EmbeddingClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        EmbeddingClient {
            api_key,
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .gemini_api_key
            .clone()
            .context("GEMINI_API_KEY is required for embeddings")?;
        Ok(Self::new(
            api_key,
            settings.gemini_base_url.clone(),
            settings.embedding_model.clone(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }

    /// Generate embeddings for a text
    pub async fn get_embedding(&self, text: &str) -> Result<Embedding> {
        let request = EmbeddingRequest {
            model: &self.model,
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(self.url("embedContent"))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Embedding request failed: {} {}", status, error_text));
        }

        let response_data: EmbeddingResponse = response.json().await?;

        Ok(Embedding {
            values: response_data.embedding.values,
        })
    }

    /// Generate embeddings for several texts in one request
    pub async fn get_embeddings(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = BatchEmbeddingRequest {
            requests: texts
                .iter()
                .map(|&text| EmbeddingRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.url("batchEmbedContents"))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Batch embedding request failed: {} {}",
                status,
                error_text
            ));
        }

        let response_data: BatchEmbeddingResponse = response.json().await?;
        if response_data.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response_data.embeddings.len()
            ));
        }

        Ok(response_data
            .embeddings
            .into_iter()
            .map(|data| Embedding {
                values: data.values,
            })
            .collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct BatchEmbeddingRequest<'a> {
    requests: Vec<EmbeddingRequest<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    embedding: EmbeddingData,
}

#[derive(Deserialize, Debug)]
struct BatchEmbeddingResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    values: Vec<f32>,
}
