use crate::config::{LlmProvider, Settings};
use crate::error::GenerationError;
use crate::ficha::{format_fecha, Ficha, ValidationReport};
use crate::llm::ChatModel;
use crate::prompt::{Instructions, PromptBuilder};
use crate::rag::RagSystem;
use chrono::Local;
use log::{info, warn};
use serde::Serialize;

pub const DEFAULT_USUARIO: &str = "PROYECTO_FICHAS_IA";

/// Per-request generation options
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub use_rag: bool,
    pub usuario: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            use_rag: true,
            usuario: DEFAULT_USUARIO.to_string(),
        }
    }
}

/// How a ficha was produced
#[derive(Debug, Clone, Serialize)]
pub struct GenerationMetadata {
    pub model: String,
    pub provider: LlmProvider,
    pub rag_enabled: bool,
    pub rag_examples_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFicha {
    pub ficha: Ficha,
    pub metadata: GenerationMetadata,
}

/// Retrieval + prompt + one model call + parsing
pub struct FichaGenerator<M: ChatModel> {
    model: M,
    rag: Option<RagSystem>,
    prompts: PromptBuilder,
    top_k: u64,
}

impl<M: ChatModel> FichaGenerator<M> {
    pub fn new(model: M, rag: Option<RagSystem>, instructions: Instructions, top_k: u64) -> Self {
        info!(
            "Generador listo: {} ({}), RAG {}",
            model.model_name(),
            model.provider(),
            if rag.is_some() { "activo" } else { "inactivo" }
        );
        FichaGenerator {
            model,
            rag,
            prompts: PromptBuilder::new(instructions),
            top_k,
        }
    }

    /// Build a generator from settings, loading the instructions file
    pub fn from_settings(model: M, rag: Option<RagSystem>, settings: &Settings) -> anyhow::Result<Self> {
        let instructions = Instructions::load(&settings.instructions_path)?;
        Ok(Self::new(model, rag, instructions, settings.rag_top_k))
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn rag(&self) -> Option<&RagSystem> {
        self.rag.as_ref()
    }

    /// Generate a ficha with the default model
    pub async fn generate(
        &self,
        pdf_text: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedFicha, GenerationError> {
        self.generate_with(&self.model, pdf_text, options).await
    }

    /// Generate a ficha with a specific model, sharing retrieval and prompts
    pub async fn generate_with<C: ChatModel>(
        &self,
        model: &C,
        pdf_text: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedFicha, GenerationError> {
        info!("Iniciando generación de ficha...");

        let examples = match (&self.rag, options.use_rag) {
            (Some(rag), true) => {
                info!("Recuperando ejemplos del RAG...");
                let examples = rag
                    .retrieve_similar(pdf_text, self.top_k, None)
                    .await
                    .map_err(GenerationError::Retrieval)?;
                info!("Recuperados {} ejemplos", examples.len());
                examples
            }
            _ => Vec::new(),
        };

        let system_prompt = self.prompts.system_prompt();
        let user_prompt = self.prompts.full_user_prompt(pdf_text, &examples);

        info!("Invocando LLM {}...", model.model_name());
        let output = model
            .complete(&system_prompt, &user_prompt)
            .await
            .map_err(GenerationError::Provider)?;

        let mut ficha = Ficha::from_llm_output(&output)?;
        stamp_otros_datos(&mut ficha, &options.usuario);
        info!("Ficha generada: {}", ficha.nombre_ayuda);

        Ok(GeneratedFicha {
            ficha,
            metadata: GenerationMetadata {
                model: model.model_name().to_string(),
                provider: model.provider(),
                rag_enabled: options.use_rag && self.rag.is_some(),
                rag_examples_count: examples.len(),
            },
        })
    }

    /// Check business rules and the date range; failures are logged, never fatal
    pub fn validate(&self, ficha: &Ficha) -> ValidationReport {
        let report = ficha.validate();
        if !report.valid {
            for violation in &report.errors {
                warn!("Validación fallida en {}: {}", violation.field, violation.message);
            }
        }
        report
    }
}

fn stamp_otros_datos(ficha: &mut Ficha, usuario: &str) {
    ficha.otros_datos.usuario = usuario.to_string();
    if ficha.otros_datos.fecha.trim().is_empty() {
        ficha.otros_datos.fecha = format_fecha(Local::now().date_naive());
    }
}
