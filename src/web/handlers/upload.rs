use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::BytesMut;
use futures::StreamExt;
use log::{error, info};

use crate::assistant::Material;
use crate::error::ApiError;
use crate::types::{FileInfo, Role};
use crate::web::models::{UploadResponse, UploadedContent};
use crate::AppState;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
const MAX_DOCUMENT_CHARS: usize = 100_000;
const TRUNCATION_NOTICE: &str = "\n\n[Conteúdo truncado devido ao tamanho...]";
const MAX_RETURNED_CHARS: usize = 10_000;

const IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/heic"];
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".heic"];
const DOCUMENT_TYPES: [&str; 4] = [
    "application/pdf",
    "text/plain",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/markdown",
];
const DOCUMENT_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".docx", ".md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    /// Matches on MIME type or file extension. Images win when both match.
    fn detect(mime: &str, file_name: &str) -> Option<UploadKind> {
        let mime = mime.to_lowercase();
        let name = file_name.to_lowercase();
        if IMAGE_TYPES.contains(&mime.as_str()) || IMAGE_EXTENSIONS.iter().any(|e| name.ends_with(e)) {
            Some(UploadKind::Image)
        } else if DOCUMENT_TYPES.contains(&mime.as_str())
            || DOCUMENT_EXTENSIONS.iter().any(|e| name.ends_with(e))
        {
            Some(UploadKind::Document)
        } else {
            None
        }
    }
}

struct UploadedFile {
    name: String,
    mime: String,
    bytes: Vec<u8>,
}

fn image_mime(mime: &str, file_name: &str) -> String {
    if mime.starts_with("image/") {
        return mime.to_string();
    }
    let name = file_name.to_lowercase();
    if name.ends_with(".png") {
        "image/png".to_string()
    } else if name.ends_with(".heic") {
        "image/heic".to_string()
    } else {
        "image/jpeg".to_string()
    }
}

fn truncate_chars(text: &str, max: usize, suffix: &str) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}{}", head, suffix)
    } else {
        text.to_string()
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::BadRequest(format!(
        "A requisição deve ser do tipo multipart/form-data: {}",
        e
    ))
}

fn too_large() -> ApiError {
    ApiError::BadRequest(format!(
        "O arquivo é muito grande. O tamanho máximo é {}MB.",
        MAX_FILE_SIZE / (1024 * 1024)
    ))
}

/// Reads a field, refusing to hold more than `limit` bytes.
async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if buf.len() + chunk.len() > limit {
            return Err(too_large());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.to_vec())
}

// File upload and analysis endpoint
pub async fn upload(
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut file: Option<UploadedFile> = None;
    let mut session_id: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(multipart_error)?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().unwrap_or("arquivo").to_string();

        match name.as_str() {
            "file" => {
                let mime = field
                    .content_type()
                    .map(|m| m.essence_str().to_lowercase())
                    .unwrap_or_default();
                let bytes = read_field(&mut field, MAX_FILE_SIZE).await?;
                file = Some(UploadedFile {
                    name: file_name,
                    mime,
                    bytes,
                });
            }
            "sessionId" => {
                let raw = read_field(&mut field, 256).await?;
                let id = String::from_utf8_lossy(&raw).trim().to_string();
                if !id.is_empty() {
                    session_id = Some(id);
                }
            }
            _ => {
                read_field(&mut field, MAX_FILE_SIZE).await?;
            }
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("Nenhum arquivo foi enviado".to_string()))?;
    if file.bytes.is_empty() {
        return Err(ApiError::BadRequest("O arquivo está vazio".to_string()));
    }

    let kind = UploadKind::detect(&file.mime, &file.name).ok_or_else(|| {
        ApiError::BadRequest(
            "Formato de arquivo não suportado. Use PDF, TXT, DOCX, MD, JPG, PNG ou HEIC.".to_string(),
        )
    })?;

    info!(
        "Upload {} ({}, {} bytes, {:?})",
        file.name,
        file.mime,
        file.bytes.len(),
        kind
    );

    let (material, file_content) = match kind {
        UploadKind::Image => {
            let mime_type = image_mime(&file.mime, &file.name);
            let encoded = STANDARD.encode(&file.bytes);
            let data_url = format!("data:{};base64,{}", mime_type, encoded);
            (
                Material::Image {
                    mime_type,
                    data: encoded,
                },
                data_url,
            )
        }
        UploadKind::Document => {
            let text = truncate_chars(
                &String::from_utf8_lossy(&file.bytes),
                MAX_DOCUMENT_CHARS,
                TRUNCATION_NOTICE,
            );
            (
                Material::Document {
                    name: file.name.clone(),
                    text: text.clone(),
                },
                text,
            )
        }
    };

    let analysis = data
        .assistant
        .chat
        .analyze_file(&material)
        .await
        .map_err(|e| {
            error!("File analysis failed for {}: {}", file.name, e);
            ApiError::Upstream(format!("Erro interno ao processar o arquivo: {}", e))
        })?;

    let file_content = truncate_chars(&file_content, MAX_RETURNED_CHARS, "...");

    if let Some(id) = &session_id {
        let info = FileInfo {
            file_name: file.name.clone(),
            file_type: file.mime.clone(),
            file_content: Some(file_content.clone()),
            timestamp: None,
        };
        if let Err(e) = record_upload(&data, id, &info, &analysis) {
            error!("Failed to store upload for session {}: {}", id, e);
        }
    }

    Ok(HttpResponse::Ok().json(UploadResponse {
        analysis,
        file_info: UploadedContent { file_content },
    }))
}

fn record_upload(
    data: &AppState,
    session_id: &str,
    info: &FileInfo,
    analysis: &str,
) -> Result<(), ApiError> {
    let mut store = data.lock_store()?;
    store.save_uploaded_file(session_id, info)?;
    store.append_message(session_id, Role::Assistant, analysis)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fake::FakeModel;
    use crate::model::Part;
    use crate::web::handlers::testing;
    use crate::web::routes;
    use actix_web::{test as actix_test, App};

    const BOUNDARY: &str = "----studyboundary";

    fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file {
                Some((file_name, mime)) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, file_name, mime
                        )
                        .as_bytes(),
                    );
                }
                None => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> actix_test::TestRequest {
        actix_test::TestRequest::post()
            .uri("/api/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(UploadKind::detect("image/png", "a.png"), Some(UploadKind::Image));
        assert_eq!(
            UploadKind::detect("application/octet-stream", "foto.HEIC"),
            Some(UploadKind::Image)
        );
        assert_eq!(UploadKind::detect("text/markdown", "notas"), Some(UploadKind::Document));
        assert_eq!(UploadKind::detect("", "aula.docx"), Some(UploadKind::Document));
        assert_eq!(UploadKind::detect("application/zip", "a.zip"), None);
    }

    #[test]
    fn test_document_truncation() {
        let long = "x".repeat(MAX_DOCUMENT_CHARS + 1);
        let text = truncate_chars(&long, MAX_DOCUMENT_CHARS, TRUNCATION_NOTICE);
        assert!(text.ends_with(TRUNCATION_NOTICE));
        assert_eq!(text.chars().count(), MAX_DOCUMENT_CHARS + TRUNCATION_NOTICE.chars().count());
    }

    #[actix_web::test]
    async fn test_document_upload_is_analyzed_and_stored() {
        let (state, model) = testing::state(FakeModel::new().with_reply("**Resumo**: mitose"));
        let session = state.lock_store().unwrap().create_session(None).unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::configure),
        )
        .await;

        let body = multipart_body(&[
            ("file", Some(("biologia.txt", "text/plain")), &b"Mitose e meiose"[..]),
            ("sessionId", None, session.id.as_bytes()),
        ]);
        let resp = actix_test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["analysis"], "<strong>Resumo</strong>: mitose");
        assert_eq!(body["fileInfo"]["fileContent"], "Mitose e meiose");

        let prompt = model.requests()[0].contents[0].text();
        assert!(prompt.contains("biologia.txt"));
        assert!(prompt.contains("Mitose e meiose"));

        let store = state.lock_store().unwrap();
        let file = store.uploaded_file(&session.id).unwrap().unwrap();
        assert_eq!(file.file_name, "biologia.txt");
        let stored = store.get_session(&session.id).unwrap().unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].role, Role::Assistant);
    }

    #[actix_web::test]
    async fn test_image_upload_sends_inline_data() {
        let (state, model) = testing::state(FakeModel::new().with_reply("Uma célula"));
        let app = actix_test::init_service(App::new().app_data(state).configure(routes::configure)).await;

        let body = multipart_body(&[("file", Some(("celula.png", "image/png")), &b"\x89PNG"[..])]);
        let resp = actix_test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["fileInfo"]["fileContent"], "data:image/png;base64,iVBORw==");

        let parts = &model.requests()[0].contents[0].parts;
        assert!(matches!(&parts[1], Part::InlineData { data, .. } if data == "iVBORw=="));
    }

    #[actix_web::test]
    async fn test_rejected_uploads() {
        let (state, model) = testing::state(FakeModel::new());
        let app = actix_test::init_service(App::new().app_data(state).configure(routes::configure)).await;

        let unsupported = multipart_body(&[("file", Some(("a.zip", "application/zip")), &b"PK"[..])]);
        let empty = multipart_body(&[("file", Some(("a.txt", "text/plain")), &b""[..])]);
        let missing = multipart_body(&[("sessionId", None, &b"abc"[..])]);
        let oversized_content = vec![b'a'; MAX_FILE_SIZE + 1];
        let oversized =
            multipart_body(&[("file", Some(("a.txt", "text/plain")), &oversized_content[..])]);

        for body in [unsupported, empty, missing, oversized] {
            let resp = actix_test::call_service(&app, upload_request(body).to_request()).await;
            assert_eq!(resp.status(), 400);
            let body: serde_json::Value = actix_test::read_body_json(resp).await;
            assert!(body["error"].is_string());
        }
        assert!(model.requests().is_empty());
    }

    #[actix_web::test]
    async fn test_analysis_failure_is_500() {
        let (state, _) = testing::state(FakeModel::new());
        let app = actix_test::init_service(App::new().app_data(state).configure(routes::configure)).await;

        let body = multipart_body(&[("file", Some(("a.md", "text/markdown")), &b"# Notas"[..])]);
        let resp = actix_test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), 500);
    }
}
