//! The Ficha record: one social-aid program described field by field.
//!
//! Structural shape (types, enumerations, dates) and the field rules
//! (mandatory leading sentences, `€` in every cuantía item, unique documents)
//! are enforced while parsing the model output, so a ficha breaking them is
//! never rendered. [`Ficha::validate`] reports the field rules plus the date
//! range checks for fichas built or edited elsewhere.

use crate::error::FichaParseError;
use crate::text::format_currency;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const PLAZO_PREFIX: &str = "El plazo permanecerá abierto hasta";
pub const REQUISITOS_PREFIX: &str = "Los requisitos para optar a las ayudas son los siguientes:";
pub const BENEFICIARIOS_PREFIX: &str = "Podrán ser beneficiarias:";
pub const CUANTIA_PREFIX: &str = "La cuantía de la ayuda será:";
pub const DOCUMENTOS_PREFIX: &str = "La documentación a presentar es la siguiente:";

/// Longest accepted application window
const MAX_RANGE_DAYS: i64 = 1825;

macro_rules! labeled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labeled_enum!(
    /// Portals a ficha is published in. Declaration order is the canonical order.
    Portal {
        Mayores => "Mayores",
        Discapacidad => "Discapacidad",
        Familia => "Familia",
        Mujer => "Mujer",
        Salud => "Salud",
    }
);

labeled_enum!(
    Categoria {
        Basicas => "Básicas",
        Vivienda => "Vivienda",
        Enseres => "Enseres",
        Salud => "Salud",
        Discapacidad => "Discapacidad",
        Dependencia => "Dependencia",
        Servicios => "Servicios",
        Rentas => "Rentas",
        Tecnicas => "Técnicas",
        Catastrofes => "Catástrofes",
        Acogimiento => "Acogimiento",
    }
);

labeled_enum!(
    TipoAyuda {
        Accesibilidad => "Accesibilidad",
        Acogimiento => "Acogimiento",
        Alimentacion => "Alimentación",
        AtencionTemprana => "Atención temprana",
        Basicas => "Básicas",
        BonificacionImpuestos => "Bonificación impuestos",
        CarnetConducir => "Carnet de Conducir",
        Catastrofes => "Catástrofes",
        ComplementariasDependencias => "Complementarias Dependencias",
        Conciliacion => "Conciliación",
        CulturaOcio => "Cultura - Ocio",
        Discapacidad => "Discapacidad",
        Emigrantes => "Emigrantes",
        Energia => "Energía",
        Enseres => "Enseres",
        Estudios => "Estudios",
        Familia => "Familia",
        Funcionarios => "Funcionarios",
        IngresoMinimoVital => "Ingreso Mínimo Vital",
        Natalidad => "Natalidad",
        Paliativos => "Paliativos",
        Reclusos => "Reclusos",
        Rentas => "Rentas",
        Salud => "Salud",
        Servicios => "Servicios",
        Tecnicas => "Técnicas",
        Tecnologia => "Tecnología",
        Termalismo => "Termalismo",
        TrabajoEmprendimiento => "Trabajo - Emprendimiento",
        Transporte => "Transporte",
        Viajes => "Viajes",
        ViolenciaGenero => "Violencia de Género",
        Vivienda => "Vivienda",
    }
);

/// Where and how applications are submitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LugarPresentacion {
    #[serde(default)]
    pub presencial: Vec<String>,
    #[serde(default)]
    pub electronica: Vec<String>,
}

/// Bookkeeping block printed at the end of the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtrosDatos {
    #[serde(rename = "USUARIO", default)]
    pub usuario: String,
    /// Creation date, dd/mm/aaaa
    #[serde(rename = "FECHA", default)]
    pub fecha: String,
    /// Only for state, regional or provincial aid; at most 20 words
    #[serde(rename = "FRASE_PARA_PUBLICITAR", default)]
    pub frase_para_publicitar: Option<Vec<String>>,
    #[serde(rename = "DOCUMENTOS_ADJUNTOS", default)]
    pub documentos_adjuntos: Vec<String>,
}

/// Structured description of one social-aid program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ficha {
    pub nombre_ayuda: String,
    pub portales: Vec<Portal>,
    pub categoria: Vec<Categoria>,
    pub tipo_ayuda: TipoAyuda,

    #[serde(with = "fecha")]
    pub fecha_inicio: NaiveDate,
    #[serde(with = "fecha")]
    pub fecha_fin: NaiveDate,
    #[serde(with = "fecha_opcional", default)]
    pub fecha_publicacion: Option<NaiveDate>,

    pub ambito_territorial: String,
    pub administracion: String,

    pub plazo_presentacion: String,
    pub requisitos_acceso: String,
    pub beneficiarios: String,

    pub descripcion: String,
    pub cuantia: Vec<String>,
    pub importe_maximo: String,

    pub resolucion: String,
    pub documentos_presentar: Vec<String>,
    #[serde(default)]
    pub costes_no_subvencionables: Option<String>,
    #[serde(default)]
    pub criterios_concesion: Option<String>,

    pub normativa_reguladora: Vec<String>,
    #[serde(default)]
    pub referencia_legislativa: Vec<String>,

    pub lugar_presentacion: LugarPresentacion,
    pub otros_datos: OtrosDatos,
}

/// One failed business rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Outcome of [`Ficha::validate`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldViolation>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<FieldViolation>) -> Self {
        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn has_error_for(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap());

impl Ficha {
    /// Parse a model response into a ficha.
    ///
    /// Accepts bare JSON, JSON inside Markdown fences, or JSON surrounded by
    /// prose. Fenced blocks are tried in order, then the text from the first
    /// `{`. The portal list is put in canonical order and the field rules
    /// must hold.
    pub fn from_llm_output(output: &str) -> Result<Self, FichaParseError> {
        let mut first_error = None;
        let mut parsed = None;
        for candidate in json_candidates(output) {
            match first_json_value(candidate) {
                Ok(ficha) => {
                    parsed = Some(ficha);
                    break;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        let mut ficha: Ficha = match (parsed, first_error) {
            (Some(ficha), _) => ficha,
            (None, Some(e)) => return Err(e),
            (None, None) => return Err(FichaParseError::NoJsonObject),
        };
        ficha.normalize();

        let violations = ficha.rule_violations();
        if !violations.is_empty() {
            return Err(FichaParseError::Rules(violations));
        }
        Ok(ficha)
    }

    /// Apply canonical ordering to the portal list
    pub fn normalize(&mut self) {
        self.portales.sort();
        self.portales.dedup();
    }

    /// Check every presentation and business rule, collecting all violations
    pub fn validate(&self) -> ValidationReport {
        let mut errors = self.rule_violations();

        if self.fecha_fin < self.fecha_inicio {
            errors.push(FieldViolation {
                field: "fecha_fin",
                message: "La fecha de fin no puede ser anterior a la fecha de inicio".to_string(),
            });
        } else if (self.fecha_fin - self.fecha_inicio).num_days() > MAX_RANGE_DAYS {
            errors.push(FieldViolation {
                field: "fecha_fin",
                message: "El rango de fechas es demasiado largo (máximo 5 años)".to_string(),
            });
        }

        ValidationReport::from_errors(errors)
    }

    /// Field rules a parsed ficha must satisfy
    fn rule_violations(&self) -> Vec<FieldViolation> {
        let mut errors = Vec::new();
        let mut fail = |field: &'static str, message: String| {
            errors.push(FieldViolation { field, message });
        };

        if self.portales.is_empty() {
            fail("portales", "Debe indicarse al menos un portal".to_string());
        } else if !self.portales.windows(2).all(|w| w[0] < w[1]) {
            fail(
                "portales",
                "Los portales deben seguir el orden: Mayores, Discapacidad, Familia, Mujer, Salud"
                    .to_string(),
            );
        }
        if self.categoria.is_empty() {
            fail("categoria", "Debe indicarse al menos una categoría".to_string());
        }

        if !self.plazo_presentacion.starts_with(PLAZO_PREFIX) {
            fail(
                "plazo_presentacion",
                format!("El plazo debe usar la fórmula: '{} [fecha]'", PLAZO_PREFIX),
            );
        }
        if !self.requisitos_acceso.starts_with(REQUISITOS_PREFIX) {
            fail(
                "requisitos_acceso",
                format!("Los requisitos deben iniciar con: '{}'", REQUISITOS_PREFIX),
            );
        }
        if !self.beneficiarios.starts_with(BENEFICIARIOS_PREFIX) {
            fail(
                "beneficiarios",
                format!("Beneficiarios debe iniciar con: '{}'", BENEFICIARIOS_PREFIX),
            );
        }

        if self.cuantia.is_empty() {
            fail("cuantia", "La cuantía no puede estar vacía".to_string());
        }
        for item in self.cuantia.iter().filter(|item| !item.contains('€')) {
            fail(
                "cuantia",
                format!("Cada elemento de cuantía debe incluir el símbolo €: {}", item),
            );
        }

        if self.documentos_presentar.is_empty() {
            fail(
                "documentos_presentar",
                "Debe indicarse al menos un documento".to_string(),
            );
        }
        let mut seen = HashSet::new();
        for doc in &self.documentos_presentar {
            if !seen.insert(doc.trim()) {
                fail(
                    "documentos_presentar",
                    format!("Los documentos no pueden estar duplicados: {}", doc),
                );
            }
        }

        if self.normativa_reguladora.is_empty() {
            fail(
                "normativa_reguladora",
                "Debe indicarse al menos una norma reguladora".to_string(),
            );
        }

        errors
    }
}

/// Places a JSON object may start: each fenced block, then the first `{`
fn json_candidates(output: &str) -> Vec<&str> {
    let mut candidates: Vec<&str> = RE_JSON_FENCE
        .captures_iter(output)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if let Some(start) = output.find('{') {
        candidates.push(&output[start..]);
    }
    candidates
}

/// Deserialize the leading JSON value, ignoring whatever follows it
fn first_json_value(candidate: &str) -> Result<Ficha, FichaParseError> {
    serde_json::Deserializer::from_str(candidate)
        .into_iter::<Ficha>()
        .next()
        .ok_or(FichaParseError::NoJsonObject)?
        .map_err(FichaParseError::from)
}

/// Format a date the way fichas print it
pub fn format_fecha(date: NaiveDate) -> String {
    date.format(fecha::FORMAT).to_string()
}

/// Parse `dd/mm/aaaa` or ISO `aaaa-mm-dd`
pub fn parse_fecha(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, fecha::FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

mod fecha {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_fecha(&raw)
            .ok_or_else(|| de::Error::custom(format!("fecha no válida: {}", raw)))
    }
}

mod fecha_opcional {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => super::fecha::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_fecha(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("fecha no válida: {}", raw))),
        }
    }
}

/// Economic reference values quoted in beneficiary thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValoresReferencia {
    pub anio: i32,
    pub iprem_dia: f64,
    pub iprem_mes: f64,
    pub iprem_anual_12: f64,
    pub iprem_anual_14: f64,
    pub smi_dia: f64,
    pub smi_mes: f64,
    pub smi_anual_14: f64,
    pub irsc_mes: f64,
    pub irsc_anual: f64,
}

impl ValoresReferencia {
    pub const VALORES_2025: ValoresReferencia = ValoresReferencia {
        anio: 2025,
        iprem_dia: 20.0,
        iprem_mes: 600.0,
        iprem_anual_12: 7200.0,
        iprem_anual_14: 8400.0,
        smi_dia: 39.47,
        smi_mes: 1184.0,
        smi_anual_14: 16576.0,
        irsc_mes: 778.49,
        irsc_anual: 9341.92,
    };

    /// Markdown block listing every value in Spanish currency format
    pub fn to_markdown(&self) -> String {
        format!(
            "**IPREM {anio}:**\n- Día: {}\n- Mes: {}\n- Año (12 pagas): {}\n- Año (14 pagas): {}\n\n\
             **SMI {anio}:**\n- Día: {}\n- Mes: {}\n- Año (14 pagas): {}\n\n\
             **IRSC Cataluña {anio}:**\n- Mes: {}\n- Año: {}",
            format_currency(self.iprem_dia),
            format_currency(self.iprem_mes),
            format_currency(self.iprem_anual_12),
            format_currency(self.iprem_anual_14),
            format_currency(self.smi_dia),
            format_currency(self.smi_mes),
            format_currency(self.smi_anual_14),
            format_currency(self.irsc_mes),
            format_currency(self.irsc_anual),
            anio = self.anio,
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const EXAMPLE_JSON: &str = r#"{
        "nombre_ayuda": "Ayudas de Emergencia Social 2025",
        "portales": ["Familia", "Mayores"],
        "categoria": ["Básicas"],
        "tipo_ayuda": "Básicas",
        "fecha_inicio": "2025-01-01",
        "fecha_fin": "31/12/2025",
        "fecha_publicacion": "15/12/2024",
        "ambito_territorial": "Municipal",
        "administracion": "Ayuntamiento de Madrid (Madrid)",
        "plazo_presentacion": "El plazo permanecerá abierto hasta 31/12/2025",
        "requisitos_acceso": "Los requisitos para optar a las ayudas son los siguientes:\n- Estar empadronado en Madrid.",
        "beneficiarios": "Podrán ser beneficiarias:\n- Personas físicas empadronadas.",
        "descripcion": "Ayudas económicas para situaciones de emergencia social.",
        "cuantia": ["Hasta 600,00 € por solicitud"],
        "importe_maximo": "600,00 € por solicitud",
        "resolucion": "Plazo máximo de 3 meses. Silencio administrativo negativo.",
        "documentos_presentar": ["DNI o NIE.", "Certificado de empadronamiento."],
        "costes_no_subvencionables": null,
        "normativa_reguladora": ["Bases Reguladoras. BOP Madrid núm. 45, 15/01/2025."],
        "lugar_presentacion": {
            "presencial": ["Oficinas de Servicios Sociales."],
            "electronica": ["Sede electrónica: https://sede.madrid.es/tramite"]
        },
        "otros_datos": {
            "USUARIO": "PROYECTO_FICHAS_IA",
            "FECHA": "15/11/2025",
            "FRASE_PARA_PUBLICITAR": ["Solicita tu ayuda de emergencia."]
        }
    }"#;

    pub(crate) fn example_ficha() -> Ficha {
        Ficha::from_llm_output(EXAMPLE_JSON).unwrap()
    }

    #[test]
    fn test_parse_example() {
        let ficha = example_ficha();
        assert_eq!(ficha.tipo_ayuda, TipoAyuda::Basicas);
        assert_eq!(ficha.categoria, vec![Categoria::Basicas]);
        assert_eq!(ficha.fecha_inicio, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(ficha.fecha_fin, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(ficha.fecha_publicacion, NaiveDate::from_ymd_opt(2024, 12, 15));
        assert!(ficha.referencia_legislativa.is_empty());
        assert!(ficha.otros_datos.documentos_adjuntos.is_empty());
        assert!(ficha.validate().valid, "{:?}", ficha.validate());
    }

    #[test]
    fn test_portales_reordered_to_canonical_sequence() {
        let ficha = example_ficha();
        assert_eq!(ficha.portales, vec![Portal::Mayores, Portal::Familia]);

        let mut ficha = ficha;
        ficha.portales = vec![Portal::Salud, Portal::Mujer, Portal::Discapacidad, Portal::Mujer];
        ficha.normalize();
        assert_eq!(
            ficha.portales,
            vec![Portal::Discapacidad, Portal::Mujer, Portal::Salud]
        );
    }

    #[test]
    fn test_unordered_portales_reported_when_not_normalized() {
        let mut ficha = example_ficha();
        ficha.portales = vec![Portal::Salud, Portal::Mayores];
        assert!(ficha.validate().has_error_for("portales"));
    }

    #[test]
    fn test_cuantia_without_currency_symbol_rejected() {
        let mut ficha = example_ficha();
        ficha.cuantia = vec!["Hasta 600,00 €".to_string(), "Hasta 300 euros".to_string()];
        let report = ficha.validate();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "cuantia");
        assert!(report.errors[0].message.contains("Hasta 300 euros"));
    }

    #[test]
    fn test_empty_cuantia_rejected() {
        let mut ficha = example_ficha();
        ficha.cuantia.clear();
        assert!(ficha.validate().has_error_for("cuantia"));
    }

    #[test]
    fn test_duplicate_documents_rejected() {
        let mut ficha = example_ficha();
        ficha.documentos_presentar = vec![
            "DNI o NIE.".to_string(),
            "Certificado de empadronamiento.".to_string(),
            "DNI o NIE.".to_string(),
        ];
        let report = ficha.validate();
        assert!(!report.valid);
        assert!(report.has_error_for("documentos_presentar"));
    }

    #[test]
    fn test_leading_phrases_enforced() {
        let mut ficha = example_ficha();
        ficha.plazo_presentacion = "Hasta el 31/12/2025".to_string();
        ficha.requisitos_acceso = "Requisitos: estar empadronado".to_string();
        ficha.beneficiarios = "Personas empadronadas".to_string();

        let report = ficha.validate();
        assert_eq!(report.errors.len(), 3);
        assert!(report.has_error_for("plazo_presentacion"));
        assert!(report.has_error_for("requisitos_acceso"));
        assert!(report.has_error_for("beneficiarios"));
    }

    #[test]
    fn test_date_range_rules() {
        let mut ficha = example_ficha();
        ficha.fecha_fin = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(ficha.validate().has_error_for("fecha_fin"));

        ficha.fecha_fin = NaiveDate::from_ymd_opt(2031, 1, 1).unwrap();
        assert!(ficha.validate().has_error_for("fecha_fin"));
    }

    #[test]
    fn test_from_llm_output_with_fence_and_prose() {
        let fenced = format!("Aquí tienes la ficha:\n```json\n{}\n```\nSaludos.", EXAMPLE_JSON);
        assert_eq!(Ficha::from_llm_output(&fenced).unwrap(), example_ficha());

        let prose = format!("Resultado: {} -- fin", EXAMPLE_JSON);
        assert_eq!(Ficha::from_llm_output(&prose).unwrap(), example_ficha());
    }

    #[test]
    fn test_from_llm_output_errors() {
        assert!(matches!(
            Ficha::from_llm_output("no puedo generar la ficha"),
            Err(FichaParseError::NoJsonObject)
        ));

        let bad_enum = EXAMPLE_JSON.replace(r#""tipo_ayuda": "Básicas""#, r#""tipo_ayuda": "Otra""#);
        assert!(matches!(
            Ficha::from_llm_output(&bad_enum),
            Err(FichaParseError::Json(_))
        ));

        let bad_date = EXAMPLE_JSON.replace("2025-01-01", "1 de enero");
        let err = Ficha::from_llm_output(&bad_date).unwrap_err();
        assert!(err.to_string().contains("fecha no válida"));
    }

    #[test]
    fn test_from_llm_output_rejects_rule_violations() {
        let broken = EXAMPLE_JSON
            .replace("Hasta 600,00 € por solicitud", "Hasta 300 euros")
            .replace(
                "El plazo permanecerá abierto hasta 31/12/2025",
                "Hasta fin de año",
            )
            .replace("\"Certificado de empadronamiento.\"", "\"DNI o NIE.\"");

        match Ficha::from_llm_output(&broken) {
            Err(FichaParseError::Rules(violations)) => {
                let fields: Vec<&str> = violations.iter().map(|v| v.field).collect();
                assert_eq!(
                    fields,
                    vec!["plazo_presentacion", "cuantia", "documentos_presentar"]
                );
            }
            other => panic!("expected rule violations, got {:?}", other),
        }
    }

    #[test]
    fn test_from_llm_output_uses_first_parsable_fence() {
        let reply = format!(
            "```json\n{}\n```\nY otra versión:\n```json\n{{\"x\": 1}}\n```",
            EXAMPLE_JSON
        );
        assert_eq!(Ficha::from_llm_output(&reply).unwrap(), example_ficha());

        let reply = format!(
            "```json\n{{\"x\": 1}}\n```\nCorregida:\n```json\n{}\n```",
            EXAMPLE_JSON
        );
        assert_eq!(Ficha::from_llm_output(&reply).unwrap(), example_ficha());
    }

    #[test]
    fn test_serialized_dates_use_spanish_format() {
        let value = serde_json::to_value(example_ficha()).unwrap();
        assert_eq!(value["fecha_inicio"], "01/01/2025");
        assert_eq!(value["fecha_publicacion"], "15/12/2024");
        assert_eq!(value["portales"][0], "Mayores");
        assert_eq!(value["otros_datos"]["USUARIO"], "PROYECTO_FICHAS_IA");
    }

    #[test]
    fn test_reference_values_markdown() {
        let text = ValoresReferencia::VALORES_2025.to_markdown();
        assert!(text.contains("**IPREM 2025:**"));
        assert!(text.contains("- Mes: 600,00 €"));
        assert!(text.contains("- Año (14 pagas): 16.576,00 €"));
        assert!(text.contains("- Año: 9.341,92 €"));
    }

    #[test]
    fn test_enum_catalogues() {
        assert_eq!(Portal::ALL.len(), 5);
        assert_eq!(Categoria::ALL.len(), 11);
        assert_eq!(TipoAyuda::ALL.len(), 33);
        assert_eq!(TipoAyuda::ViolenciaGenero.as_str(), "Violencia de Género");
    }
}
