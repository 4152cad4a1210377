//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use farmbook_translator::core::models::DocumentUpload;
use farmbook_translator::{
    create_router, AppState, TranslationError, TranslationProvider, TranslationRequest,
    TranslatorConfig, UsageInfo,
};

/// Deterministic provider: uppercases text, prefixes documents
#[derive(Default)]
pub struct StubProvider {
    pub text_calls: AtomicUsize,
    pub document_calls: AtomicUsize,
    pub usage_calls: AtomicUsize,
    pub fail: bool,
}

impl StubProvider {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn total_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
            + self.document_calls.load(Ordering::SeqCst)
            + self.usage_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for StubProvider {
    async fn translate_text(
        &self,
        request: &TranslationRequest,
    ) -> Result<String, TranslationError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranslationError::provider(Some(456), "Quota exceeded"));
        }
        Ok(request.text.to_uppercase())
    }

    async fn translate_document(
        &self,
        document: DocumentUpload,
        target_lang: &str,
        _source_lang: Option<&str>,
    ) -> Result<Vec<u8>, TranslationError> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranslationError::provider(Some(400), "Unsupported file type"));
        }
        let mut out = format!("{}:{}:", target_lang, document.upload_name()).into_bytes();
        out.extend_from_slice(&document.bytes);
        Ok(out)
    }

    async fn get_usage(&self) -> Result<UsageInfo, TranslationError> {
        self.usage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(json!({
            "character_count": 42,
            "character_limit": 500000,
            "document_count": 1
        }))
        .map_err(TranslationError::from)?)
    }
}

pub fn test_config() -> TranslatorConfig {
    TranslatorConfig {
        api_key: Some("test-key".to_string()),
        timeout_ms: 5_000,
        max_concurrent: 4,
        document_poll_interval_ms: 10,
        document_timeout_ms: 2_000,
        ..Default::default()
    }
}

/// Router around a stub provider, or around no provider at all
pub fn app(provider: Option<Arc<StubProvider>>) -> Router {
    let provider = provider.map(|p| p as Arc<dyn TranslationProvider>);
    let state = AppState::with_provider(test_config(), provider).unwrap();
    create_router(state)
}

/// Serve `router` on an ephemeral local port
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Static file server: `/files/report.pdf` exists, everything else is 404
pub fn file_server() -> Router {
    Router::new().route(
        "/files/report.pdf",
        get(|| async { (StatusCode::OK, Body::from("%PDF-1.4 fake")) }),
    )
}

pub async fn body_bytes(body: Body) -> Bytes {
    axum::body::to_bytes(body, usize::MAX).await.unwrap()
}

pub async fn body_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

/// Encode `multipart/form-data`; fields are (name, file name, content)
pub fn multipart_body(boundary: &str, fields: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

/// In-process stand-in for the DeepL REST API
#[derive(Default)]
pub struct MockDeepL {
    pub translate_calls: AtomicUsize,
    pub status_polls: AtomicUsize,
    pub uploaded: Mutex<Option<(String, String, Vec<u8>)>>,
}

pub const MOCK_KEY: &str = "test-key";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("DeepL-Auth-Key {}", MOCK_KEY))
        .unwrap_or(false)
}

fn forbidden() -> axum::response::Response {
    (StatusCode::FORBIDDEN, Json(json!({"message": "Wrong endpoint"}))).into_response()
}

async fn mock_translate(
    State(mock): State<Arc<MockDeepL>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return forbidden();
    }
    mock.translate_calls.fetch_add(1, Ordering::SeqCst);

    let text = body["text"][0].as_str().unwrap_or_default().to_string();
    let target = body["target_lang"].as_str().unwrap_or_default().to_string();
    let source = body["source_lang"].as_str().unwrap_or("EN").to_string();

    if text == "quota" {
        return (
            StatusCode::from_u16(456).unwrap(),
            Json(json!({"message": "Quota Exceeded"})),
        )
            .into_response();
    }

    Json(json!({
        "translations": [{
            "detected_source_language": source,
            "text": format!("[{}] {}", target, text)
        }]
    }))
    .into_response()
}

async fn mock_usage(headers: HeaderMap) -> axum::response::Response {
    if !authorized(&headers) {
        return forbidden();
    }
    Json(json!({"character_count": 1234, "character_limit": 500000})).into_response()
}

async fn mock_upload(
    State(mock): State<Arc<MockDeepL>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> axum::response::Response {
    if !authorized(&headers) {
        return forbidden();
    }

    let mut file_name = String::new();
    let mut target = String::new();
    let mut bytes = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or_default().to_string();
                bytes = field.bytes().await.unwrap().to_vec();
            }
            "target_lang" => target = field.text().await.unwrap(),
            _ => {}
        }
    }

    let document_id = if file_name.contains("slow") {
        "slow"
    } else if file_name.contains("broken") {
        "broken"
    } else {
        "doc-1"
    };
    *mock.uploaded.lock().unwrap() = Some((file_name, target, bytes));

    Json(json!({"document_id": document_id, "document_key": "key-1"})).into_response()
}

async fn mock_status(
    State(mock): State<Arc<MockDeepL>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    assert_eq!(body["document_key"], "key-1");
    let polls = mock.status_polls.fetch_add(1, Ordering::SeqCst);

    let status = match id.as_str() {
        "slow" => json!({"document_id": id, "status": "translating", "seconds_remaining": 60}),
        "broken" => json!({"document_id": id, "status": "error", "error_message": "Source and target language are equal"}),
        _ if polls == 0 => json!({"document_id": id, "status": "queued"}),
        _ => json!({"document_id": id, "status": "done", "billed_characters": 12}),
    };
    Json(status).into_response()
}

async fn mock_result(State(mock): State<Arc<MockDeepL>>, Path(_id): Path<String>) -> Vec<u8> {
    let uploaded = mock.uploaded.lock().unwrap();
    let (_, target, bytes) = uploaded.as_ref().unwrap();
    let mut out = format!("{}|", target).into_bytes();
    out.extend(bytes.iter().map(|b| b.to_ascii_uppercase()));
    out
}

pub fn mock_deepl(mock: Arc<MockDeepL>) -> Router {
    Router::new()
        .route("/v2/translate", post(mock_translate))
        .route("/v2/usage", get(mock_usage))
        .route("/v2/document", post(mock_upload))
        .route("/v2/document/:id", post(mock_status))
        .route("/v2/document/:id/result", post(mock_result))
        .with_state(mock)
}
