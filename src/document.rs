use crate::error::ExtractError;
use crate::text::parse_spanish_date;
use chrono::NaiveDate;
use log::{debug, info, warn};
use lopdf::{Dictionary, Object};
use mime_guess::from_path;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Below this many characters the extraction is considered a failure
pub const MIN_TEXT_CHARS: usize = 100;

const BOLETIN_HEADER_WINDOW: usize = 2000;
const BOLETIN_DETAIL_WINDOW: usize = 3000;

/// A convocatoria PDF with its cleaned text and metadata
#[derive(Debug, Clone, Serialize)]
pub struct PdfDocument {
    pub text: String,
    pub metadata: PdfMetadata,
    pub boletin: BoletinInfo,
}

impl PdfDocument {
    /// Extract text, metadata and boletín detection from a PDF file
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, ExtractError> {
        let path = file_path.as_ref();
        info!("Extracción completa de: {}", path.display());

        let text = extract_text(path)?;
        let metadata = extract_metadata(path)?;
        let boletin = detect_boletin(&text);

        Ok(PdfDocument {
            text,
            metadata,
            boletin,
        })
    }
}

/// Document-level information read from the PDF trailer
#[derive(Debug, Clone, Default, Serialize)]
pub struct PdfMetadata {
    pub filename: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub pages: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub encrypted: bool,
}

/// Official gazettes recognised in a document header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoletinKind {
    Bop,
    Boe,
    Boja,
    Bocm,
    Dogc,
    Bopv,
}

/// Result of scanning a document for official gazette provenance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoletinInfo {
    pub es_boletin: bool,
    pub tipo: Option<BoletinKind>,
    pub cabecera: Option<String>,
    pub numero: Option<String>,
    pub fecha: Option<String>,
    pub fecha_normalizada: Option<NaiveDate>,
}

static BOLETIN_PATTERNS: Lazy<Vec<(BoletinKind, Regex)>> = Lazy::new(|| {
    [
        (BoletinKind::Bop, r"BOLET[ÍI]N OFICIAL DE LA PROVINCIA"),
        (BoletinKind::Boe, r"BOLET[ÍI]N OFICIAL DEL ESTADO"),
        (BoletinKind::Boja, r"BOLET[ÍI]N OFICIAL DE LA JUNTA DE ANDALUC[ÍI]A"),
        (BoletinKind::Bocm, r"BOLET[ÍI]N OFICIAL DE LA COMUNIDAD DE MADRID"),
        (BoletinKind::Dogc, r"DIARI OFICIAL DE LA GENERALITAT DE CATALUNYA"),
        (BoletinKind::Bopv, r"BOLET[ÍI]N OFICIAL DEL PA[ÍI]S VASCO"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(&format!("(?i){}", pattern)).unwrap()))
    .collect()
});

static RE_NUMERO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)n[úu]m(?:ero)?[.\s:]+(\d+)").unwrap());
static RE_FECHA_LARGA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d{1,2}\s+de\s+\w+\s+de\s+\d{4}").unwrap());

static RE_CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]").unwrap());
static RE_PAGE_NUMBER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^ *\d+ *$").unwrap());
static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?: *\n){2,}").unwrap());

/// Extract the cleaned full text of a PDF
pub fn extract_text<P: AsRef<Path>>(file_path: P) -> Result<String, ExtractError> {
    let path = file_path.as_ref();
    check_pdf(path)?;

    info!("Extrayendo texto de: {}", path.display());

    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|_| ExtractError::Extraction {
            path: path.to_path_buf(),
            detail: "el parser PDF abortó".to_string(),
        })?
        .map_err(|e| ExtractError::Extraction {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let total_pages = pages.len();
    let mut text_parts = Vec::with_capacity(total_pages);
    for (idx, page) in pages.into_iter().enumerate() {
        if page.trim().is_empty() {
            continue;
        }
        debug!("Página {}: {} caracteres", idx + 1, page.chars().count());
        text_parts.push(page);
    }

    let raw_text = text_parts.join("\n\n");
    info!(
        "Extracción completa: {} caracteres, {} páginas",
        raw_text.chars().count(),
        total_pages
    );

    let cleaned = clean_text(&raw_text);
    if cleaned.is_empty() {
        warn!("El texto extraído está vacío: {}", path.display());
    }

    Ok(cleaned)
}

/// Read page count and info-dictionary fields of a PDF
pub fn extract_metadata<P: AsRef<Path>>(file_path: P) -> Result<PdfMetadata, ExtractError> {
    let path = file_path.as_ref();
    check_pdf(path)?;

    info!("Extrayendo metadatos de: {}", path.display());

    let size_bytes = fs::metadata(path)?.len();
    let doc = lopdf::Document::load(path).map_err(|e| ExtractError::Extraction {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut metadata = PdfMetadata {
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
        size_bytes,
        size_mb: (size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        pages: doc.get_pages().len(),
        encrypted: doc.is_encrypted(),
        ..Default::default()
    };

    let info_dict = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_dict().ok());

    if let Some(dict) = info_dict {
        metadata.title = info_field(dict, b"Title");
        metadata.author = info_field(dict, b"Author");
        metadata.subject = info_field(dict, b"Subject");
        metadata.creator = info_field(dict, b"Creator");
        metadata.producer = info_field(dict, b"Producer");
        metadata.creation_date = info_field(dict, b"CreationDate");
        metadata.modification_date = info_field(dict, b"ModDate");
    }

    info!(
        "Metadatos extraídos: {} páginas, {} MB",
        metadata.pages, metadata.size_mb
    );

    Ok(metadata)
}

/// Normalize text extracted from a PDF: whitespace, control characters,
/// dashes and bare page-number lines
pub fn clean_text(raw_text: &str) -> String {
    let text = raw_text.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.replace('\t', " ");
    let text = RE_CONTROL_CHARS.replace_all(&text, "");
    let text = text.replace(['–', '—'], "-");
    let text = RE_PAGE_NUMBER_LINE.replace_all(&text, "");
    let text = RE_MULTI_SPACE.replace_all(&text, " ");
    let text = RE_BLANK_RUN.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Detect whether the text comes from an official gazette (BOP, BOE, ...)
pub fn detect_boletin(text: &str) -> BoletinInfo {
    let header = prefix_chars(text, BOLETIN_HEADER_WINDOW);
    let detail = prefix_chars(text, BOLETIN_DETAIL_WINDOW);

    let detected = BOLETIN_PATTERNS
        .iter()
        .find_map(|(kind, re)| re.find(header).map(|m| (*kind, m.as_str().to_string())));

    let numero = RE_NUMERO.captures(detail).map(|caps| caps[1].to_string());
    let fecha = RE_FECHA_LARGA.find(detail).map(|m| m.as_str().to_string());
    let fecha_normalizada = fecha.as_deref().and_then(parse_spanish_date);

    BoletinInfo {
        es_boletin: detected.is_some(),
        tipo: detected.as_ref().map(|(kind, _)| *kind),
        cabecera: detected.map(|(_, header)| header),
        numero,
        fecha,
        fecha_normalizada,
    }
}

/// Reject paths that are missing, not PDFs by extension, or lack the `%PDF` header
fn check_pdf(path: &Path) -> Result<(), ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mime_type = from_path(path).first_or_octet_stream().to_string();
    if mime_type != "application/pdf" {
        return Err(ExtractError::UnsupportedFormat {
            path: path.to_path_buf(),
            mime_type,
        });
    }

    let mut header = [0u8; 4];
    let mut file = File::open(path)?;
    if file.read_exact(&mut header).is_err() || &header != b"%PDF" {
        return Err(ExtractError::InvalidPdf {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

fn info_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|value| value.as_str().ok())
        .map(decode_pdf_string)
        .filter(|value| !value.trim().is_empty())
}

fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// PDF text strings are either UTF-16BE with a BOM or PDFDocEncoding
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
