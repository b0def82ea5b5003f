//! HTTP interface around the generation pipeline.

mod error;
mod fichas;
mod state;
mod system;

pub use error::ApiError;
pub use fichas::{FichaGenerateRequest, FichaGenerateResponse};
pub use state::AppState;

use crate::llm::ChatModel;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::get,
    Router,
};
use log::{info, warn};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const API_PREFIX: &str = "/api/v1";

/// Room for multipart framing and the config field on top of the PDF itself
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn router<M: ChatModel + 'static>() -> Router<AppState<M>> {
    Router::new()
        .merge(system::router())
        .merge(fichas::router())
}

/// Full application: API routes, root endpoint, body limit and CORS
pub fn app<M: ChatModel + 'static>(state: AppState<M>) -> Router {
    let body_limit = state
        .settings
        .max_pdf_size_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES);
    let cors = cors_layer(&state.settings.cors_origins_list());

    Router::new()
        .route("/", get(system::root))
        .nest(API_PREFIX, router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Origen CORS no válido ignorado: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind to the configured address and serve until shutdown
pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.settings.host, state.settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} v{}", system::APP_NAME, system::VERSION);
    info!("Servidor escuchando en http://{}", addr);
    axum::serve(listener, app(state))
        .await
        .context("Server error")?;
    Ok(())
}
