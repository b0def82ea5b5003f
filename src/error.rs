use crate::ficha::FieldViolation;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading a convocatoria PDF
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF no encontrado: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Formato no soportado: {mime_type} ({})", path.display())]
    UnsupportedFormat { path: PathBuf, mime_type: String },

    #[error("El archivo no es un PDF válido: {}", path.display())]
    InvalidPdf { path: PathBuf },

    #[error("Error extrayendo texto del PDF {}: {detail}", path.display())]
    Extraction { path: PathBuf, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single generation run. None of them are retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Error recuperando ejemplos del RAG: {0:#}")]
    Retrieval(anyhow::Error),

    #[error("Error del proveedor LLM: {0:#}")]
    Provider(anyhow::Error),

    #[error("La respuesta del modelo no cumple el schema de la ficha: {0}")]
    Parse(#[from] FichaParseError),
}

/// The model output could not be turned into a `Ficha`
#[derive(Debug, Error)]
pub enum FichaParseError {
    #[error("no se encontró un objeto JSON en la respuesta")]
    NoJsonObject,

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("la ficha incumple las reglas de campo: {}", describe_violations(.0))]
    Rules(Vec<FieldViolation>),
}

fn describe_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}
