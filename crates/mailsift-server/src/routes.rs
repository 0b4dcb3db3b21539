use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use mailsift_core::{
    extract_with_cache, resolve, ExtractionRequest, ProvenanceMap, SourceDocument,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

struct UploadedFile {
    filename: String,
    mime_type: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    email_pdf: Option<UploadedFile>,
    attachments: Vec<UploadedFile>,
    /// Legacy field: first entry is the email, the rest are attachments
    files: Vec<UploadedFile>,
    guess_mode: bool,
    model: Option<String>,
}

/// Read all multipart parts up front; parts may arrive in any order.
async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed multipart body: {}", e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "email_pdf" | "attachments" | "files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read part '{}': {}", name, e))?
                    .to_vec();
                let file = UploadedFile {
                    filename,
                    mime_type,
                    data,
                };
                match name.as_str() {
                    "email_pdf" => form.email_pdf = Some(file),
                    "attachments" => form.attachments.push(file),
                    _ => form.files.push(file),
                }
            }
            "guess_mode" => {
                let value = field.text().await.unwrap_or_default();
                form.guess_mode = matches!(value.trim(), "true" | "1");
            }
            "model" => {
                let value = field.text().await.unwrap_or_default();
                if !value.trim().is_empty() {
                    form.model = Some(value.trim().to_string());
                }
            }
            other => {
                tracing::debug!("Ignoring unknown multipart field: {}", other);
            }
        }
    }

    // Back-compat: a bare 'files' list means email first, attachments after
    if form.email_pdf.is_none() && form.attachments.is_empty() && !form.files.is_empty() {
        let mut files = std::mem::take(&mut form.files);
        form.email_pdf = Some(files.remove(0));
        form.attachments = files;
    }

    Ok(form)
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
        }
    };

    let Some(email_file) = form.email_pdf else {
        // files is only still populated when other file parts also arrived
        let message = if form.attachments.is_empty() && form.files.is_empty() {
            "No files provided"
        } else {
            "Missing 'email_pdf' file"
        };
        return (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response();
    };

    let start = Instant::now();

    let email_doc =
        SourceDocument::from_bytes(&email_file.filename, &email_file.mime_type, &email_file.data);
    let attachment_docs: Vec<SourceDocument> = form
        .attachments
        .iter()
        .map(|f| SourceDocument::from_bytes(&f.filename, &f.mime_type, &f.data))
        .collect();

    let model = form.model.unwrap_or_else(|| state.model.clone());
    let request = ExtractionRequest::new(&email_doc, &attachment_docs, model, form.guess_mode);

    let outcome = extract_with_cache(state.cache.as_ref(), state.client.as_ref(), &request).await;

    let provenance = match outcome.data() {
        Some(data) => resolve(data, &email_doc, &attachment_docs),
        None => ProvenanceMap::new(),
    };

    let attachment_meta: Vec<_> = attachment_docs.iter().map(SourceDocument::metadata).collect();

    Json(json!({
        "email_document": email_doc.metadata(),
        "attachments": attachment_meta,
        "document_count": 1 + attachment_docs.len(),
        "llm_parsed": outcome,
        "provenance": provenance,
        "elapsed_ms": start.elapsed().as_millis() as u64,
    }))
    .into_response()
}
