use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use fichas_ayudas::api::{app, AppState};
use fichas_ayudas::config::{LlmProvider, Settings};
use fichas_ayudas::generator::FichaGenerator;
use fichas_ayudas::llm::ChatModel;
use fichas_ayudas::prompt::Instructions;
use fichas_ayudas::word::extract_docx_text;
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "fichas-test-boundary";

const FICHA_JSON: &str = r#"{
    "nombre_ayuda": "Ayudas de Emergencia Social 2025",
    "portales": ["Familia", "Mayores"],
    "categoria": ["Básicas"],
    "tipo_ayuda": "Básicas",
    "fecha_inicio": "01/01/2025",
    "fecha_fin": "31/12/2025",
    "ambito_territorial": "Municipal",
    "administracion": "Ayuntamiento de Madrid (Madrid)",
    "plazo_presentacion": "El plazo permanecerá abierto hasta 31/12/2025",
    "requisitos_acceso": "Los requisitos para optar a las ayudas son los siguientes:\n- Estar empadronado.",
    "beneficiarios": "Podrán ser beneficiarias:\n- Personas empadronadas.",
    "descripcion": "Ayudas económicas para situaciones de emergencia social.",
    "cuantia": ["Hasta 600,00 € por solicitud"],
    "importe_maximo": "600,00 € por solicitud",
    "resolucion": "Plazo máximo de 3 meses.",
    "documentos_presentar": ["DNI o NIE.", "Certificado de empadronamiento."],
    "normativa_reguladora": ["Bases Reguladoras. BOP Madrid núm. 45, 15/01/2025."],
    "lugar_presentacion": {
        "presencial": ["Oficinas de Servicios Sociales."],
        "electronica": ["Sede electrónica."]
    },
    "otros_datos": {"USUARIO": "", "FECHA": ""}
}"#;

const CONVOCATORIA_TEXT: &str = "Convocatoria de ayudas de emergencia social del Ayuntamiento \
     de Madrid para el ejercicio 2025 dirigidas a familias empadronadas";

/// Chat model answering every prompt with a fixed reply
struct FakeModel {
    reply: Result<String, String>,
}

impl FakeModel {
    fn replying(reply: &str) -> Self {
        FakeModel {
            reply: Ok(reply.to_string()),
        }
    }

    fn failing(error: &str) -> Self {
        FakeModel {
            reply: Err(error.to_string()),
        }
    }
}

impl ChatModel for FakeModel {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> anyhow::Result<String> {
        self.reply.clone().map_err(anyhow::Error::msg)
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }
}

/// Write a one-page PDF whose only text is `text`
fn write_pdf(path: &Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![40.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn pdf_bytes(dir: &TempDir, text: &str) -> Vec<u8> {
    let path = dir.path().join("fixture.pdf");
    write_pdf(&path, text);
    std::fs::read(&path).unwrap()
}

fn output_files(test: &TestApp) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(test.dir.path().join("output"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

struct TestApp {
    router: Router,
    dir: TempDir,
}

fn test_app() -> TestApp {
    test_app_with(FakeModel::replying(FICHA_JSON))
}

fn test_app_with(model: FakeModel) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let temp_dir = dir.path().join("temp");
    let output_dir = dir.path().join("output");
    let pairs = vec![
        ("GEMINI_API_KEY".to_string(), "test-key".to_string()),
        ("USE_RAG".to_string(), "false".to_string()),
        ("MAX_PDF_SIZE_MB".to_string(), "1".to_string()),
        ("TEMP_DIR".to_string(), temp_dir.to_string_lossy().into_owned()),
        ("OUTPUT_DIR".to_string(), output_dir.to_string_lossy().into_owned()),
    ];
    let settings = Settings::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap();
    settings.ensure_directories().unwrap();

    let generator = FichaGenerator::new(model, None, Instructions::default(), settings.rag_top_k);
    TestApp {
        router: app(AppState::new(settings, generator)),
        dir,
    }
}

fn multipart_body(file_name: &str, content: &[u8], config: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(config) = config {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"config\"\r\n\r\n{config}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_upload(router: Router, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/generate-ficha")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_disconnected_vector_db() {
    let test = test_app();
    let (status, body) = get(test.router, "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["llm_provider"], "gemini");
    assert_eq!(body["rag_enabled"], false);
    assert_eq!(body["vector_db"], "disconnected");
}

#[tokio::test]
async fn root_links_to_health() {
    let test = test_app();
    let (status, body) = get(test.router, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"], "/api/v1/health");
}

#[tokio::test]
async fn rag_info_unavailable_without_rag() {
    let test = test_app();
    let (status, body) = get(test.router, "/api/v1/rag/info").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("RAG"));
}

#[tokio::test]
async fn status_of_unknown_ficha() {
    let test = test_app();
    let id = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    let (status, body) = get(test.router, &format!("/api/v1/status/{id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");
    assert!(body.get("download_url").is_none());
}

#[tokio::test]
async fn status_and_download_of_existing_ficha() {
    let test = test_app();
    let id = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    std::fs::write(
        test.dir.path().join("output").join(format!("{id}.docx")),
        b"docx bytes",
    )
    .unwrap();

    let (status, body) = get(test.router.clone(), &format!("/api/v1/status/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["download_url"], format!("/api/v1/download/{id}"));

    let request = Request::builder()
        .uri(format!("/api/v1/download/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = test.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(&format!("ficha_{id}.docx")));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"docx bytes");
}

#[tokio::test]
async fn download_unknown_ficha_is_404() {
    let test = test_app();

    let (status, body) = get(
        test.router.clone(),
        "/api/v1/download/1b4e28ba-2fa1-11d2-883f-0016d3cca427",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Ficha no encontrada");

    let (status, _) = get(test.router, "/api/v1/download/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_config_is_400() {
    let test = test_app();
    let body = multipart_body("convocatoria.pdf", b"%PDF-1.4", Some("{not json"));
    let (status, body) = post_upload(test.router, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Config JSON"));
}

#[tokio::test]
async fn unknown_model_is_400() {
    let test = test_app();
    let body = multipart_body("convocatoria.pdf", b"%PDF-1.4", Some(r#"{"model": "llama-3"}"#));
    let (status, _) = post_upload(test.router, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn model_without_api_key_is_400() {
    let test = test_app();
    let body = multipart_body("convocatoria.pdf", b"%PDF-1.4", Some(r#"{"model": "gpt-4o"}"#));
    let (status, body) = post_upload(test.router, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("openai"));
}

#[tokio::test]
async fn missing_file_is_400() {
    let test = test_app();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"config\"\r\n\r\n{{}}\r\n--{BOUNDARY}--\r\n"
    );
    let (status, _) = post_upload(test.router, body.into_bytes()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_pdf_upload_is_415() {
    let test = test_app();
    let body = multipart_body("notas.txt", b"texto plano", None);
    let (status, _) = post_upload(test.router, body).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn fake_pdf_is_415_and_temp_file_removed() {
    let test = test_app();
    let body = multipart_body("convocatoria.pdf", b"esto no es un pdf", None);
    let (status, _) = post_upload(test.router, body).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let leftovers = std::fs::read_dir(test.dir.path().join("temp")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn oversized_pdf_is_413() {
    let test = test_app();
    let mut content = b"%PDF-1.4\n".to_vec();
    content.resize(1024 * 1024 + 10, b'0');
    let body = multipart_body("convocatoria.pdf", &content, None);
    let (status, body) = post_upload(test.router, body).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["detail"].as_str().unwrap().contains("1 MB"));
}

#[tokio::test]
async fn generate_ficha_success_writes_docx() {
    let test = test_app();
    let pdf = pdf_bytes(&test.dir, CONVOCATORIA_TEXT);
    let body = multipart_body("convocatoria.pdf", &pdf, Some(r#"{"usuario": "tecnico"}"#));
    let (status, body) = post_upload(test.router.clone(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success", "{}", body);
    let ficha_id = body["ficha_id"].as_str().unwrap().to_string();
    assert_eq!(body["download_url"], format!("/api/v1/download/{ficha_id}"));
    assert_eq!(body["metadata"]["model_used"], "fake-model");
    assert_eq!(body["metadata"]["rag_enabled"], false);
    assert_eq!(body["metadata"]["validation_passed"], true);
    assert!(body["metadata"]["pdf_text_length"].as_u64().unwrap() >= 100);

    let docx = test.dir.path().join("output").join(format!("{ficha_id}.docx"));
    let text = extract_docx_text(&docx).unwrap();
    assert!(text.contains("Ayudas de Emergencia Social 2025"));
    assert!(text.contains("tecnico"));

    let leftovers = std::fs::read_dir(test.dir.path().join("temp")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn skipped_validation_is_not_reported_as_passed() {
    let test = test_app();
    let pdf = pdf_bytes(&test.dir, CONVOCATORIA_TEXT);
    let body = multipart_body("convocatoria.pdf", &pdf, Some(r#"{"validate_output": false}"#));
    let (status, body) = post_upload(test.router, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success", "{}", body);
    assert!(body["metadata"]["validation_passed"].is_null());
}

#[tokio::test]
async fn rule_breaking_ficha_is_an_error_without_document() {
    let reply = FICHA_JSON.replace("Hasta 600,00 € por solicitud", "Hasta 300 euros");
    let test = test_app_with(FakeModel::replying(&reply));
    let pdf = pdf_bytes(&test.dir, CONVOCATORIA_TEXT);
    let body = multipart_body("convocatoria.pdf", &pdf, None);
    let (status, body) = post_upload(test.router.clone(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["download_url"].is_null());
    assert!(body["error_message"].as_str().unwrap().contains("cuantia"));
    assert!(output_files(&test).is_empty());
}

#[tokio::test]
async fn unparsable_reply_is_an_error() {
    let test = test_app_with(FakeModel::replying("No puedo generar la ficha."));
    let pdf = pdf_bytes(&test.dir, CONVOCATORIA_TEXT);
    let (status, body) = post_upload(test.router.clone(), multipart_body("c.pdf", &pdf, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(output_files(&test).is_empty());
}

#[tokio::test]
async fn provider_failure_is_an_error() {
    let test = test_app_with(FakeModel::failing("429 Too Many Requests"));
    let pdf = pdf_bytes(&test.dir, CONVOCATORIA_TEXT);
    let (status, body) = post_upload(test.router, multipart_body("c.pdf", &pdf, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["error_message"].as_str().unwrap().contains("429"));
}

#[tokio::test]
async fn short_pdf_text_is_422() {
    let test = test_app();
    let pdf = pdf_bytes(&test.dir, "Hola");
    let (status, body) = post_upload(test.router, multipart_body("c.pdf", &pdf, None)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("texto suficiente"));
}
