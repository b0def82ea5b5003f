//! `.docx` rendering of a ficha, and plain-text extraction of existing fichas.
//!
//! A docx file is a zip archive of OOXML parts. Only the parts needed for a
//! single-section document with bullet lists are written.

use crate::ficha::{format_fecha, Ficha};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults>
<w:rPrDefault><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Arial"/><w:sz w:val="22"/><w:lang w:val="es-ES"/></w:rPr></w:rPrDefault>
<w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault>
</w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="40"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:color w:val="000080"/><w:sz w:val="26"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:spacing w:after="60"/></w:pPr></w:style>
</w:styles>"#;

const NUMBERING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:abstractNum w:abstractNumId="0">
<w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl>
</w:abstractNum>
<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
</w:numbering>"#;

const DOCUMENT_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_FOOTER: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1417" w:right="1701" w:bottom="1417" w:left="1701" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

/// Writes fichas as Word documents with a fixed layout
#[derive(Debug, Clone, Copy, Default)]
pub struct WordGenerator;

impl WordGenerator {
    pub fn new() -> Self {
        WordGenerator
    }

    /// Render `ficha` into a `.docx` file at `output_path`
    pub fn generate<P: AsRef<Path>>(&self, ficha: &Ficha, output_path: P) -> Result<()> {
        let output_path = output_path.as_ref();
        info!("Generando Word: {}", output_path.display());

        let file = File::create(output_path)
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        self.write(ficha, file)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        info!("Documento generado: {}", output_path.display());
        Ok(())
    }

    /// Write the docx archive to any seekable writer
    pub fn write<W: Write + Seek>(&self, ficha: &Ficha, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
            ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
            ("docProps/core.xml", core_properties(ficha)),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.to_string()),
            ("word/styles.xml", STYLES_XML.to_string()),
            ("word/numbering.xml", NUMBERING_XML.to_string()),
            ("word/document.xml", document_xml(ficha)),
        ];

        for (name, content) in parts {
            zip.start_file(name, options)?;
            zip.write_all(content.as_bytes())?;
        }
        zip.finish()?;
        Ok(())
    }
}

fn core_properties(ficha: &Ficha) -> String {
    let created = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>{}</dc:title>
<dc:creator>{}</dc:creator>
<dc:language>es-ES</dc:language>
<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>
<dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified>
</cp:coreProperties>"#,
        escape_xml(&ficha.nombre_ayuda),
        escape_xml(&ficha.otros_datos.usuario),
    )
}

fn document_xml(ficha: &Ficha) -> String {
    let mut body = DocxBody::default();

    body.title(&ficha.nombre_ayuda);
    body.spacer();

    let portales: Vec<&str> = ficha.portales.iter().map(|p| p.as_str()).collect();
    let categorias: Vec<&str> = ficha.categoria.iter().map(|c| c.as_str()).collect();
    body.paragraph(&[
        Run::bold("Portales: "),
        Run::plain(&portales.join(", ")),
        Run::plain(" | "),
        Run::bold("Categoría: "),
        Run::plain(&categorias.join(", ")),
    ]);
    body.spacer();

    body.field("Tipo de ayuda", ficha.tipo_ayuda.as_str());
    body.field("Fecha de inicio", &format_fecha(ficha.fecha_inicio));
    body.field("Fecha de fin", &format_fecha(ficha.fecha_fin));
    if let Some(fecha) = ficha.fecha_publicacion {
        body.field("Fecha de publicación", &format_fecha(fecha));
    }
    body.field("Ámbito territorial", &ficha.ambito_territorial);
    body.field("Administración convocante", &ficha.administracion);
    body.field("Plazo de presentación", &ficha.plazo_presentacion);
    body.field("Beneficiarios/Destinatarios", &ficha.beneficiarios);
    body.field("Requisitos de acceso", &ficha.requisitos_acceso);
    body.field("Descripción", &ficha.descripcion);
    body.list_field("Cuantía", &ficha.cuantia);
    body.field("Importe máximo", &ficha.importe_maximo);
    body.field("Resolución", &ficha.resolucion);
    body.list_field("Documentos a presentar", &ficha.documentos_presentar);
    if let Some(costes) = non_empty(&ficha.costes_no_subvencionables) {
        body.field("Costes no subvencionables", costes);
    }
    if let Some(criterios) = non_empty(&ficha.criterios_concesion) {
        body.field("Criterios de concesión", criterios);
    }
    body.list_field("Normativa reguladora", &ficha.normativa_reguladora);
    if !ficha.referencia_legislativa.is_empty() {
        body.list_field("Referencia legislativa", &ficha.referencia_legislativa);
    }

    body.heading("Lugar y forma de presentación");
    let lugar = &ficha.lugar_presentacion;
    if !lugar.presencial.is_empty() {
        body.paragraph(&[Run::bold("Presencialmente en:")]);
        for item in &lugar.presencial {
            body.bullet(item);
        }
    }
    if !lugar.electronica.is_empty() {
        body.paragraph(&[Run::bold("Electrónicamente en:")]);
        for item in &lugar.electronica {
            body.bullet(item);
        }
    }

    body.page_break();
    body.heading("Otros datos");
    let otros = &ficha.otros_datos;
    body.field("USUARIO", &otros.usuario);
    body.field("FECHA", &otros.fecha);
    if let Some(frases) = otros.frase_para_publicitar.as_ref().filter(|f| !f.is_empty()) {
        body.list_field("FRASE PARA PUBLICITAR", frases);
    }
    if !otros.documentos_adjuntos.is_empty() {
        body.list_field("DOCUMENTOS ADJUNTOS", &otros.documentos_adjuntos);
    }

    body.finish()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

struct Run<'a> {
    text: &'a str,
    bold: bool,
}

impl<'a> Run<'a> {
    fn plain(text: &'a str) -> Self {
        Run { text, bold: false }
    }

    fn bold(text: &'a str) -> Self {
        Run { text, bold: true }
    }

    /// Newlines become `<w:br/>` inside the same run
    fn to_xml(&self) -> String {
        let mut xml = String::from("<w:r>");
        if self.bold {
            xml.push_str("<w:rPr><w:b/></w:rPr>");
        }
        for (i, line) in self.text.split('\n').enumerate() {
            if i > 0 {
                xml.push_str("<w:br/>");
            }
            xml.push_str(r#"<w:t xml:space="preserve">"#);
            xml.push_str(&escape_xml(line));
            xml.push_str("</w:t>");
        }
        xml.push_str("</w:r>");
        xml
    }
}

#[derive(Default)]
struct DocxBody {
    xml: String,
}

impl DocxBody {
    fn styled(&mut self, style: Option<&str>, runs: &[Run]) {
        self.xml.push_str("<w:p>");
        if let Some(style) = style {
            self.xml
                .push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, style));
        }
        for run in runs {
            self.xml.push_str(&run.to_xml());
        }
        self.xml.push_str("</w:p>");
    }

    fn paragraph(&mut self, runs: &[Run]) {
        self.styled(None, runs);
    }

    fn title(&mut self, text: &str) {
        self.styled(Some("Title"), &[Run::plain(text)]);
    }

    fn heading(&mut self, text: &str) {
        self.styled(Some("Heading2"), &[Run::plain(text)]);
    }

    fn bullet(&mut self, text: &str) {
        self.styled(Some("ListBullet"), &[Run::plain(text)]);
    }

    fn spacer(&mut self) {
        self.xml.push_str("<w:p/>");
    }

    fn page_break(&mut self) {
        self.xml
            .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
    }

    /// Bold label followed by the value
    fn field(&mut self, label: &str, value: &str) {
        let label = format!("{}: ", label);
        self.paragraph(&[Run::bold(&label), Run::plain(value)]);
    }

    /// Bold label followed by one bullet per item
    fn list_field(&mut self, label: &str, items: &[String]) {
        let label = format!("{}:", label);
        self.paragraph(&[Run::bold(&label)]);
        for item in items {
            self.bullet(item);
        }
        self.spacer();
    }

    fn finish(self) -> String {
        format!("{}{}{}", DOCUMENT_HEADER, self.xml, DOCUMENT_FOOTER)
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => escaped.push(c),
        }
    }
    escaped
}

static RE_XML_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|(lt|gt|quot|apos|amp));").unwrap()
});

/// Decode named and numeric character references in one pass
fn unescape_xml(text: &str) -> String {
    RE_XML_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let code = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(dec), _, _) => dec.as_str().parse::<u32>().ok(),
                (_, Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (_, _, Some(name)) => Some(u32::from(match name.as_str() {
                    "lt" => '<',
                    "gt" => '>',
                    "quot" => '"',
                    "apos" => '\'',
                    _ => '&',
                })),
                _ => None,
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p(?:\s[^>]*)?>.*?</w:p>").unwrap());
static RE_TEXT_OR_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:br\s*/>|<w:tab\s*/>").unwrap()
});

/// Read the non-empty paragraphs of a `.docx`, one per line
pub fn extract_docx_text<P: AsRef<Path>>(docx_path: P) -> Result<String> {
    let docx_path = docx_path.as_ref();
    let file = File::open(docx_path)
        .with_context(|| format!("Failed to open DOCX file: {}", docx_path.display()))?;
    read_docx_text(file)
        .with_context(|| format!("Failed to read DOCX: {}", docx_path.display()))
}

fn read_docx_text<R: Read + Seek>(reader: R) -> Result<String> {
    let mut archive = ZipArchive::new(reader)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| anyhow!("Invalid DOCX file: word/document.xml not found"))?
        .read_to_string(&mut xml)?;

    let paragraphs: Vec<String> = RE_PARAGRAPH
        .find_iter(&xml)
        .map(|paragraph| {
            RE_TEXT_OR_BREAK
                .captures_iter(paragraph.as_str())
                .map(|caps| match caps.get(1) {
                    Some(text) => unescape_xml(text.as_str()),
                    None if caps[0].starts_with("<w:tab") => "\t".to_string(),
                    None => "\n".to_string(),
                })
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ficha::tests::example_ficha;
    use std::io::Cursor;

    #[test]
    fn test_generate_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ficha.docx");
        let ficha = example_ficha();

        WordGenerator::new().generate(&ficha, &path).unwrap();
        let text = extract_docx_text(&path).unwrap();

        assert!(text.starts_with("Ayudas de Emergencia Social 2025"));
        assert!(text.contains("Portales: Mayores, Familia | Categoría: Básicas"));
        assert!(text.contains("Fecha de inicio: 01/01/2025"));
        assert!(text.contains("Hasta 600,00 € por solicitud"));
        assert!(text.contains("Lugar y forma de presentación"));
        assert!(text.contains("USUARIO: PROYECTO_FICHAS_IA"));
        assert!(!text.contains("Costes no subvencionables"));
    }

    #[test]
    fn test_newlines_preserved() {
        let ficha = example_ficha();
        let mut buffer = Cursor::new(Vec::new());
        WordGenerator::new().write(&ficha, &mut buffer).unwrap();

        buffer.set_position(0);
        let text = read_docx_text(buffer).unwrap();
        assert!(text.contains(
            "Requisitos de acceso: Los requisitos para optar a las ayudas son los siguientes:\n- Estar empadronado en Madrid."
        ));
    }

    #[test]
    fn test_special_characters_escaped() {
        let mut ficha = example_ficha();
        ficha.nombre_ayuda = "Ayudas <Familia> & \"Hogar\"".to_string();

        let xml = document_xml(&ficha);
        assert!(xml.contains("Ayudas &lt;Familia&gt; &amp; &quot;Hogar&quot;"));

        let mut buffer = Cursor::new(Vec::new());
        WordGenerator::new().write(&ficha, &mut buffer).unwrap();
        buffer.set_position(0);
        let text = read_docx_text(buffer).unwrap();
        assert!(text.starts_with("Ayudas <Familia> & \"Hogar\""));
    }

    #[test]
    fn test_archive_contains_parts() {
        let mut buffer = Cursor::new(Vec::new());
        WordGenerator::new().write(&example_ficha(), &mut buffer).unwrap();
        buffer.set_position(0);

        let archive = ZipArchive::new(buffer).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/numbering.xml",
        ] {
            assert!(names.contains(&part), "missing {}", part);
        }
    }

    #[test]
    fn test_missing_document_part() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            zip.start_file("other.xml", FileOptions::default()).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        buffer.set_position(0);
        assert!(read_docx_text(buffer).is_err());
    }

    #[test]
    fn test_unescape_numeric_references() {
        assert_eq!(unescape_xml("Resoluci&#243;n &#xF1;o&#XE1;"), "Resolución ñoá");
        assert_eq!(unescape_xml("A &amp;lt; B &quot;c&quot;"), "A &lt; B \"c\"");
        assert_eq!(unescape_xml("&#xD800; &bogus;"), "&#xD800; &bogus;");
    }
}
