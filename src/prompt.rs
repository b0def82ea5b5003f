//! Prompt construction for the generation call.

use crate::database::SimilarFicha;
use crate::ficha::{
    Categoria, Portal, TipoAyuda, ValoresReferencia, BENEFICIARIOS_PREFIX, CUANTIA_PREFIX,
    DOCUMENTOS_PREFIX, PLAZO_PREFIX, REQUISITOS_PREFIX,
};
use crate::text::truncate_text;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;

/// Characters of each example quoted in the user prompt
const PROMPT_EXAMPLE_CHARS: usize = 1500;
/// Characters of each example quoted in a retrieval context
const CONTEXT_EXAMPLE_CHARS: usize = 1000;

const DEFAULT_ROLE: &str = "Eres un experto en análisis de documentación legal de ayudas sociales.";

/// Editorial rules loaded from the instructions JSON file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instructions {
    #[serde(default)]
    pub reglas_comunes: Vec<String>,
}

impl Instructions {
    /// Load instructions from `path`; a missing file yields empty instructions
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Instrucciones no encontradas en {}, usando valores por defecto",
                path.display()
            );
            return Ok(Instructions::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read instructions {}", path.display()))?;
        let instructions: Instructions = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid instructions file {}", path.display()))?;
        info!(
            "Instrucciones cargadas: {} reglas comunes",
            instructions.reglas_comunes.len()
        );
        Ok(instructions)
    }

    pub fn is_empty(&self) -> bool {
        self.reglas_comunes.is_empty()
    }
}

/// Builds the system and user prompts sent to the model
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: Instructions,
    valores: ValoresReferencia,
}

impl PromptBuilder {
    pub fn new(instructions: Instructions) -> Self {
        PromptBuilder {
            instructions,
            valores: ValoresReferencia::VALORES_2025,
        }
    }

    pub fn system_prompt(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if self.instructions.is_empty() {
            parts.push(DEFAULT_ROLE.to_string());
        } else {
            parts.push("# ROL Y OBJETIVO".to_string());
            parts.push(
                "Eres un experto en análisis de documentación legal de ayudas sociales en España."
                    .to_string(),
            );
            parts.push(
                "Tu tarea es extraer información estructurada de convocatorias y generar fichas resumidas."
                    .to_string(),
            );
            parts.push("\n# REGLAS GENERALES\n".to_string());
            parts.extend(self.instructions.reglas_comunes.iter().map(|r| format!("- {}", r)));
        }

        parts.push(format!("\n# VALORES DE REFERENCIA {}\n", self.valores.anio));
        parts.push(self.valores.to_markdown());

        parts.push("\n# FORMATO DE SALIDA\n".to_string());
        parts.push(
            "Debes generar un JSON válido siguiendo ESTRICTAMENTE el schema proporcionado."
                .to_string(),
        );
        parts.push(
            "Todos los campos con sus frases iniciales obligatorias deben ser respetados."
                .to_string(),
        );

        parts.join("\n")
    }

    /// Document, optional examples and closing instructions
    pub fn user_prompt(&self, pdf_text: &str, examples: &[SimilarFicha]) -> String {
        let mut parts = vec!["# DOCUMENTO A ANALIZAR\n".to_string(), pdf_text.to_string()];

        if !examples.is_empty() {
            parts.push("\n\n# EJEMPLOS DE REFERENCIA\n".to_string());
            parts.push("Estos son ejemplos de fichas bien estructuradas:\n".to_string());
            for (i, example) in examples.iter().enumerate() {
                parts.push(format!("\n## Ejemplo {}\n", i + 1));
                parts.push(truncate_text(&example.text, PROMPT_EXAMPLE_CHARS, ""));
                parts.push("\n---\n".to_string());
            }
        }

        parts.push("\n# INSTRUCCIONES\n".to_string());
        parts.push("Analiza el documento y genera una ficha siguiendo:".to_string());
        parts.push("1. El schema JSON proporcionado".to_string());
        parts.push("2. Las reglas generales".to_string());
        parts.push("3. Los ejemplos de referencia".to_string());
        parts.push("\nGenera ÚNICAMENTE el JSON, sin texto adicional.".to_string());

        parts.join("\n")
    }

    /// User prompt followed by the output schema description
    pub fn full_user_prompt(&self, pdf_text: &str, examples: &[SimilarFicha]) -> String {
        format!(
            "{}\n\n{}",
            self.user_prompt(pdf_text, examples),
            format_instructions()
        )
    }
}

/// Description of the expected JSON object, with every enumerated value and
/// mandatory leading phrase
pub fn format_instructions() -> String {
    let labels = |items: Vec<&'static str>| json!(items);

    let schema = json!({
        "nombre_ayuda": "string: nombre oficial de la ayuda",
        "portales": {
            "tipo": "array, al menos 1, en este orden",
            "valores": labels(Portal::ALL.iter().map(|p| p.as_str()).collect()),
        },
        "categoria": {
            "tipo": "array, al menos 1",
            "valores": labels(Categoria::ALL.iter().map(|c| c.as_str()).collect()),
        },
        "tipo_ayuda": {
            "tipo": "string, exactamente uno",
            "valores": labels(TipoAyuda::ALL.iter().map(|t| t.as_str()).collect()),
        },
        "fecha_inicio": "string dd/mm/aaaa",
        "fecha_fin": "string dd/mm/aaaa, no anterior a fecha_inicio",
        "fecha_publicacion": "string dd/mm/aaaa o null",
        "ambito_territorial": "string",
        "administracion": "string: organismo convocante",
        "plazo_presentacion": format!("string que empieza por '{}'", PLAZO_PREFIX),
        "requisitos_acceso": format!("string que empieza por '{}'", REQUISITOS_PREFIX),
        "beneficiarios": format!("string que empieza por '{}'", BENEFICIARIOS_PREFIX),
        "descripcion": "string",
        "cuantia": format!(
            "array de strings, al menos 1, cada uno con el símbolo €; introducido por '{}'",
            CUANTIA_PREFIX
        ),
        "importe_maximo": "string",
        "resolucion": "string",
        "documentos_presentar": format!(
            "array de strings sin duplicados, al menos 1; introducido por '{}'",
            DOCUMENTOS_PREFIX
        ),
        "costes_no_subvencionables": "string o null",
        "criterios_concesion": "string o null",
        "normativa_reguladora": "array de strings, al menos 1",
        "referencia_legislativa": "array de strings",
        "lugar_presentacion": {
            "presencial": "array de strings",
            "electronica": "array de strings",
        },
        "otros_datos": {
            "USUARIO": "string",
            "FECHA": "string dd/mm/aaaa",
            "FRASE_PARA_PUBLICITAR": "array de strings (máximo 20 palabras) o null",
            "DOCUMENTOS_ADJUNTOS": "array de strings",
        },
    });

    let rendered = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "La salida debe ser un único objeto JSON con estos campos:\n```json\n{}\n```",
        rendered
    )
}

/// Render a retrieval context: the document followed by similar fichas
pub fn build_context(pdf_text: &str, examples: &[SimilarFicha]) -> String {
    let mut context = format!("# DOCUMENTO A ANALIZAR\n{}\n\n", pdf_text);

    if !examples.is_empty() {
        context.push_str("# EJEMPLOS DE FICHAS SIMILARES\n\n");
        for (i, example) in examples.iter().enumerate() {
            let field = |key: &str| {
                example
                    .metadata
                    .get(key)
                    .map(String::as_str)
                    .unwrap_or("N/A")
                    .to_string()
            };
            context.push_str(&format!("## Ejemplo {}\n", i + 1));
            context.push_str(&format!("**Tipo:** {}\n", field("tipo")));
            context.push_str(&format!("**Organismo:** {}\n\n", field("organismo")));
            context.push_str(&truncate_text(&example.text, CONTEXT_EXAMPLE_CHARS, "..."));
            context.push_str("\n\n---\n\n");
        }
    }

    context
}
