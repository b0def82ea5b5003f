use crate::config::Settings;
use crate::generator::FichaGenerator;
use crate::llm::{ChatModel, LlmClient};
use crate::rag::RagSystem;
use crate::word::WordGenerator;
use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;

/// Application state shared across all requests
pub struct AppState<M: ChatModel = LlmClient> {
    pub settings: Arc<Settings>,
    pub generator: Arc<FichaGenerator<M>>,
    pub word: WordGenerator,
}

impl<M: ChatModel> Clone for AppState<M> {
    fn clone(&self) -> Self {
        AppState {
            settings: Arc::clone(&self.settings),
            generator: Arc::clone(&self.generator),
            word: self.word,
        }
    }
}

impl<M: ChatModel> AppState<M> {
    pub fn new(settings: Settings, generator: FichaGenerator<M>) -> Self {
        AppState {
            settings: Arc::new(settings),
            generator: Arc::new(generator),
            word: WordGenerator::new(),
        }
    }
}

impl AppState {
    /// Connect the services used by the handlers.
    ///
    /// A retrieval index that cannot be reached leaves the server running
    /// without examples; `/health` then reports the vector database as
    /// disconnected.
    pub async fn initialize(settings: Settings) -> Result<Self> {
        info!("Inicializando servicios...");
        settings.ensure_directories()?;

        let rag = if settings.use_rag {
            match RagSystem::connect(&settings).await {
                Ok(rag) => {
                    match rag.count().await {
                        Ok(count) => info!("RAG inicializado: {} fichas indexadas", count),
                        Err(e) => error!("No se pudo contar las fichas indexadas: {:#}", e),
                    }
                    Some(rag)
                }
                Err(e) => {
                    error!("Sistema RAG no disponible: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        let model = LlmClient::from_settings(&settings).context("Failed to configure LLM")?;
        let generator = FichaGenerator::from_settings(model, rag, &settings)?;

        info!("Servicios listos");
        Ok(Self::new(settings, generator))
    }
}
