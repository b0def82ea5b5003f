//! Index builder: loads prior fichas from a folder tree of `.docx` files.

use crate::database::FichaMetadata;
use crate::document::MIN_TEXT_CHARS;
use crate::rag::{IndexedFicha, RagSystem};
use crate::word::extract_docx_text;
use anyhow::{bail, Result};
use log::{debug, error, info, warn};
use std::path::Path;
use walkdir::WalkDir;

const UNKNOWN: &str = "desconocido";

/// What to do with fichas already in the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Refuse to run when the collection is not empty
    Fresh,
    /// Add to (or overwrite within) the existing collection
    Append,
    /// Drop every indexed ficha first
    Reindex,
}

impl IndexMode {
    pub fn from_flags(reindex: bool, append: bool) -> Self {
        if reindex {
            IndexMode::Reindex
        } else if append {
            IndexMode::Append
        } else {
            IndexMode::Fresh
        }
    }
}

/// Counts reported after an indexing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    pub before: u64,
    pub found: usize,
    pub indexed: usize,
    pub after: u64,
}

/// Whether a file name looks like a ficha document
pub fn is_ficha_file(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".docx")
        && file_name.to_lowercase().contains("ficha")
        && !file_name.starts_with('~')
}

/// Metadata from a folder named `Organismo - Tipo de ayuda`
pub fn folder_metadata(folder_name: &str) -> FichaMetadata {
    let mut metadata = FichaMetadata::new();
    let parts: Vec<&str> = folder_name.split(" - ").collect();

    let (organismo, tipo) = if parts.len() >= 2 {
        (parts[0].trim(), parts[1].trim())
    } else {
        (UNKNOWN, UNKNOWN)
    };
    metadata.insert("organismo".to_string(), organismo.to_string());
    metadata.insert("tipo".to_string(), tipo.to_string());
    metadata
}

/// Walk `dataset_path` and read every ficha with enough text
pub fn collect_fichas(dataset_path: &Path) -> Result<Vec<IndexedFicha>> {
    if !dataset_path.is_dir() {
        bail!("Dataset no encontrado: {}", dataset_path.display());
    }
    info!("Buscando fichas en: {}", dataset_path.display());

    let mut fichas = Vec::new();
    for entry in WalkDir::new(dataset_path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        if !is_ficha_file(&file_name) {
            continue;
        }
        debug!("Encontrada ficha: {}", file_name);

        let text = match extract_docx_text(path) {
            Ok(text) => text,
            Err(e) => {
                error!("Error extrayendo texto de {}: {:#}", file_name, e);
                continue;
            }
        };
        if text.chars().count() <= MIN_TEXT_CHARS {
            debug!("Ficha demasiado corta, se omite: {}", file_name);
            continue;
        }

        let folder_name = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut metadata = folder_metadata(&folder_name);
        metadata.insert("filename".to_string(), file_name.to_string());
        metadata.insert("folder".to_string(), folder_name);

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        fichas.push(IndexedFicha { id, text, metadata });
    }

    Ok(fichas)
}

/// Index every ficha under `dataset_path`
pub async fn index_dataset(
    rag: &RagSystem,
    dataset_path: &Path,
    mode: IndexMode,
) -> Result<IndexSummary> {
    let before = rag.count().await?;
    info!("Fichas actualmente indexadas: {}", before);

    if before > 0 && mode == IndexMode::Fresh {
        bail!(
            "Ya existen {} fichas indexadas. Usa --reindex para eliminar y reindexar o --append para añadir más",
            before
        );
    }

    let fichas = collect_fichas(dataset_path)?;

    if mode == IndexMode::Reindex {
        warn!("Reindexando: eliminando colección existente...");
        rag.delete_all().await?;
    }

    let indexed = if fichas.is_empty() {
        warn!("No se encontraron fichas para indexar");
        0
    } else {
        info!("Total de fichas encontradas: {}", fichas.len());
        rag.index_multiple(&fichas).await?
    };

    let after = rag.count().await?;
    Ok(IndexSummary {
        before,
        found: fichas.len(),
        indexed,
        after,
    })
}
