use anyhow::{anyhow, Context, Result};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Hosted LLM providers the generator can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    Anthropic,
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "openai",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            other => Err(anyhow!("Unsupported LLM provider: {}", other)),
        }
    }
}

/// Application settings, read once at start-up
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_provider: LlmProvider,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,

    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection_name: String,
    pub embedding_model: String,

    pub use_rag: bool,
    pub rag_top_k: u64,

    pub host: String,
    pub port: u16,
    pub max_pdf_size_mb: u64,
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cors_origins: String,
    pub instructions_path: PathBuf,
    pub log_level: String,
}

impl Settings {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Settings {
            default_provider: parse_or(get("DEFAULT_LLM_PROVIDER"), "DEFAULT_LLM_PROVIDER", LlmProvider::Gemini)?,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: text("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_base_url: text(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_model: text("ANTHROPIC_MODEL", "claude-3-5-sonnet-20241022"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: text("OPENAI_MODEL", "gpt-4o"),
            llm_max_tokens: parse_or(get("LLM_MAX_TOKENS"), "LLM_MAX_TOKENS", 4096)?,
            llm_temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", 0.3)?,

            qdrant_url: text("QDRANT_URL", "http://localhost:6334"),
            qdrant_api_key: get("QDRANT_API_KEY"),
            collection_name: text("QDRANT_COLLECTION_NAME", "fichas_ayudas_sociales"),
            embedding_model: text("EMBEDDING_MODEL", "models/text-embedding-004"),

            use_rag: parse_bool(get("USE_RAG"), "USE_RAG", true)?,
            rag_top_k: parse_or(get("RAG_TOP_K"), "RAG_TOP_K", 3)?,

            host: text("HOST", "0.0.0.0"),
            port: parse_or(get("PORT"), "PORT", 8000)?,
            max_pdf_size_mb: parse_or(get("MAX_PDF_SIZE_MB"), "MAX_PDF_SIZE_MB", 10)?,
            temp_dir: PathBuf::from(text("TEMP_DIR", "./data/temp")),
            output_dir: PathBuf::from(text("OUTPUT_DIR", "./data/output")),
            cors_origins: text("CORS_ORIGINS", "http://localhost:3000,http://localhost:8000"),
            instructions_path: PathBuf::from(text(
                "INSTRUCTIONS_PATH",
                "docs/instrucciones_ficha.json",
            )),
            log_level: text("LOG_LEVEL", "info").to_lowercase(),
        })
    }

    pub fn max_pdf_size_bytes(&self) -> usize {
        let bytes = self.max_pdf_size_mb.saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }

    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    /// API key configured for the given provider, if any
    pub fn api_key(&self, provider: LlmProvider) -> Option<&str> {
        match provider {
            LlmProvider::Gemini => self.gemini_api_key.as_deref(),
            LlmProvider::Anthropic => self.anthropic_api_key.as_deref(),
            LlmProvider::OpenAi => self.openai_api_key.as_deref(),
        }
    }

    /// Default model name for the given provider
    pub fn model_for(&self, provider: LlmProvider) -> &str {
        match provider {
            LlmProvider::Gemini => &self.gemini_model,
            LlmProvider::Anthropic => &self.anthropic_model,
            LlmProvider::OpenAi => &self.openai_model,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.temp_dir, &self.output_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("Invalid value for {}: {}", key, v)),
        },
    }
}
