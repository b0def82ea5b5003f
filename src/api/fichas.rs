use super::error::ApiError;
use super::state::AppState;
use super::API_PREFIX;
use crate::config::LlmProvider;
use crate::document::{detect_boletin, extract_text, BoletinInfo, MIN_TEXT_CHARS};
use crate::ficha::FieldViolation;
use crate::generator::{GeneratedFicha, GenerationOptions, DEFAULT_USUARIO};
use crate::llm::{ChatModel, LlmClient, ModelChoice};
use crate::text::clean_filename;
use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub fn router<M: ChatModel + 'static>() -> Router<AppState<M>> {
    Router::new()
        .route("/generate-ficha", post(generate_ficha::<M>))
        .route("/download/{ficha_id}", get(download_ficha::<M>))
        .route("/status/{ficha_id}", get(get_status::<M>))
}

/// Options sent as the `config` form field
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FichaGenerateRequest {
    pub include_rag: bool,
    pub validate_output: bool,
    pub model: Option<ModelChoice>,
    pub usuario: String,
}

impl Default for FichaGenerateRequest {
    fn default() -> Self {
        FichaGenerateRequest {
            include_rag: true,
            validate_output: true,
            model: None,
            usuario: DEFAULT_USUARIO.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerationResponseMetadata {
    pub processing_time: f64,
    pub model_used: String,
    pub provider: LlmProvider,
    pub rag_enabled: bool,
    pub rag_examples_used: usize,
    /// `None` when the request disabled validation
    pub validation_passed: Option<bool>,
    pub validation_errors: Vec<FieldViolation>,
    pub pdf_size_kb: f64,
    pub pdf_text_length: usize,
    pub boletin: BoletinInfo,
}

#[derive(Debug, Serialize)]
pub struct FichaGenerateResponse {
    pub status: &'static str,
    pub ficha_id: String,
    pub download_url: Option<String>,
    pub metadata: Option<GenerationResponseMetadata>,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ficha_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Uploaded PDF plus the optional config field
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    config: FichaGenerateRequest,
}

/// Temporary copy of the uploaded PDF, removed when dropped
struct TempPdf {
    path: PathBuf,
}

impl TempPdf {
    async fn write(dir: &std::path::Path, ficha_id: Uuid, bytes: &[u8]) -> anyhow::Result<Self> {
        let path = dir.join(format!("{}.pdf", ficha_id));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(TempPdf { path })
    }
}

impl Drop for TempPdf {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("No se pudo eliminar {}: {}", self.path.display(), e);
            }
        }
    }
}

fn download_url(ficha_id: &str) -> String {
    format!("{}/download/{}", API_PREFIX, ficha_id)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("PDF demasiado grande".to_string())
    } else {
        ApiError::BadRequest(format!("Formulario no válido: {}", err.body_text()))
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file = None;
    let mut config = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("documento.pdf").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("config") => {
                let raw = field.text().await.map_err(multipart_error)?;
                if !raw.trim().is_empty() {
                    let parsed = serde_json::from_str(&raw)
                        .map_err(|e| ApiError::BadRequest(format!("Config JSON inválido: {}", e)))?;
                    config = Some(parsed);
                }
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("Falta el archivo PDF (campo 'file')".to_string()))?;
    Ok(Upload {
        file_name,
        bytes,
        config: config.unwrap_or_default(),
    })
}

async fn generate_ficha<M: ChatModel>(
    State(state): State<AppState<M>>,
    multipart: Multipart,
) -> Result<Json<FichaGenerateResponse>, ApiError> {
    let started = Instant::now();
    let ficha_id = Uuid::new_v4();
    let settings = &state.settings;

    let upload = read_upload(multipart).await?;
    let config = &upload.config;
    info!(
        "[{}] Procesando PDF: {}",
        ficha_id,
        clean_filename(&upload.file_name, 255)
    );

    if upload.bytes.len() > settings.max_pdf_size_bytes() {
        return Err(ApiError::PayloadTooLarge(format!(
            "PDF demasiado grande. Máximo: {} MB",
            settings.max_pdf_size_mb
        )));
    }

    let mime_type = mime_guess::from_path(&upload.file_name).first_or_octet_stream();
    if mime_type.essence_str() != "application/pdf" {
        return Err(ApiError::UnsupportedMediaType(format!(
            "Formato no soportado: {}. Solo se aceptan PDF",
            mime_type
        )));
    }

    let model = config
        .model
        .map(|choice| LlmClient::for_choice(choice, settings))
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let temp_pdf = TempPdf::write(&settings.temp_dir, ficha_id, &upload.bytes).await?;

    info!("[{}] Extrayendo texto del PDF...", ficha_id);
    let pdf_path = temp_pdf.path.clone();
    let pdf_text = tokio::task::spawn_blocking(move || extract_text(pdf_path))
        .await
        .context("PDF extraction task failed")??;
    drop(temp_pdf);

    if pdf_text.chars().count() < MIN_TEXT_CHARS {
        return Err(ApiError::Unprocessable(
            "No se pudo extraer texto suficiente del PDF".to_string(),
        ));
    }
    info!(
        "[{}] Texto extraído: {} caracteres",
        ficha_id,
        pdf_text.chars().count()
    );

    let options = GenerationOptions {
        use_rag: config.include_rag,
        usuario: config.usuario.clone(),
    };

    info!("[{}] Generando ficha con LLM...", ficha_id);
    let generated = match model {
        Some(model) => state.generator.generate_with(&model, &pdf_text, &options).await,
        None => state.generator.generate(&pdf_text, &options).await,
    };
    let GeneratedFicha { ficha, metadata } = match generated {
        Ok(generated) => generated,
        Err(e) => {
            error!("[{}] Error generando ficha: {}", ficha_id, e);
            return Ok(Json(FichaGenerateResponse::failed(ficha_id, e.to_string())));
        }
    };

    let report = if config.validate_output {
        info!("[{}] Validando ficha...", ficha_id);
        Some(state.generator.validate(&ficha))
    } else {
        None
    };

    info!("[{}] Generando documento Word...", ficha_id);
    let output_path = settings.output_dir.join(format!("{}.docx", ficha_id));
    let word = state.word;
    let written = tokio::task::spawn_blocking(move || word.generate(&ficha, output_path))
        .await
        .context("Document task failed")
        .and_then(|result| result);
    if let Err(e) = written {
        error!("[{}] Error generando documento: {:#}", ficha_id, e);
        return Ok(Json(FichaGenerateResponse::failed(ficha_id, format!("{:#}", e))));
    }

    let processing_time = started.elapsed().as_secs_f64();
    info!(
        "[{}] Ficha generada exitosamente en {:.2}s",
        ficha_id, processing_time
    );

    let (validation_passed, validation_errors) = match report {
        Some(report) => (Some(report.valid), report.errors),
        None => (None, Vec::new()),
    };
    let id = ficha_id.to_string();
    Ok(Json(FichaGenerateResponse {
        status: "success",
        download_url: Some(download_url(&id)),
        ficha_id: id,
        metadata: Some(GenerationResponseMetadata {
            processing_time,
            model_used: metadata.model,
            provider: metadata.provider,
            rag_enabled: metadata.rag_enabled,
            rag_examples_used: metadata.rag_examples_count,
            validation_passed,
            validation_errors,
            pdf_size_kb: upload.bytes.len() as f64 / 1024.0,
            pdf_text_length: pdf_text.chars().count(),
            boletin: detect_boletin(&pdf_text),
        }),
        error_message: None,
    }))
}

impl FichaGenerateResponse {
    fn failed(ficha_id: Uuid, message: String) -> Self {
        FichaGenerateResponse {
            status: "error",
            ficha_id: ficha_id.to_string(),
            download_url: None,
            metadata: None,
            error_message: Some(message),
        }
    }
}

/// Path of a generated document; ids that are not UUIDs never resolve
fn docx_path<M: ChatModel>(state: &AppState<M>, ficha_id: &str) -> Option<PathBuf> {
    let id = Uuid::parse_str(ficha_id).ok()?;
    Some(state.settings.output_dir.join(format!("{}.docx", id)))
}

async fn download_ficha<M: ChatModel>(
    State(state): State<AppState<M>>,
    Path(ficha_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound("Ficha no encontrada".to_string());
    let path = docx_path(&state, &ficha_id).ok_or_else(not_found)?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to read {}", path.display()))
                .into())
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"ficha_{}.docx\"", ficha_id),
            ),
        ],
        bytes,
    ))
}

async fn get_status<M: ChatModel>(
    State(state): State<AppState<M>>,
    Path(ficha_id): Path<String>,
) -> Json<StatusResponse> {
    let exists = match docx_path(&state, &ficha_id) {
        Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
        None => false,
    };

    Json(if exists {
        StatusResponse {
            download_url: Some(download_url(&ficha_id)),
            ficha_id,
            status: "completed",
        }
    } else {
        StatusResponse {
            ficha_id,
            status: "not_found",
            download_url: None,
        }
    })
}
