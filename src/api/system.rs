use super::error::ApiError;
use super::state::AppState;
use crate::llm::ChatModel;
use crate::rag::CollectionInfo;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use log::error;
use serde::Serialize;

pub const APP_NAME: &str = "Generador de Fichas de Ayudas Sociales";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn router<M: ChatModel + 'static>() -> Router<AppState<M>> {
    Router::new()
        .route("/health", get(health_check::<M>))
        .route("/rag/info", get(rag_info::<M>))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_provider: String,
    pub rag_enabled: bool,
    pub vector_db: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RagInfoResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub info: CollectionInfo,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub app: &'static str,
    pub version: &'static str,
    pub health: &'static str,
}

async fn health_check<M: ChatModel>(State(state): State<AppState<M>>) -> Json<HealthResponse> {
    let vector_db = match state.generator.rag() {
        Some(rag) => match rag.count().await {
            Ok(_) => "connected",
            Err(e) => {
                error!("Health check: vector DB error: {:#}", e);
                "error"
            }
        },
        None => "disconnected",
    };

    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
        llm_provider: state.settings.default_provider.to_string(),
        rag_enabled: state.settings.use_rag,
        vector_db,
        timestamp: Utc::now(),
    })
}

async fn rag_info<M: ChatModel>(
    State(state): State<AppState<M>>,
) -> Result<Json<RagInfoResponse>, ApiError> {
    let rag = state
        .generator
        .rag()
        .ok_or_else(|| ApiError::ServiceUnavailable("Sistema RAG no inicializado".to_string()))?;

    let info = rag.collection_info().await?;
    Ok(Json(RagInfoResponse {
        status: "active",
        info,
    }))
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        app: APP_NAME,
        version: VERSION,
        health: "/api/v1/health",
    })
}
