//! HTTP API server implementation

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Json, Multipart, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::core::client::DeepLTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::errors::{ErrorKind, TranslationError};
use crate::core::models::{
    validate_lang_code, validate_source_lang, DocumentSource, DocumentTranslationRequest,
    JsonTranslationRequest, TranslatedDocument, UsageInfo,
};
use crate::core::provider::TranslationProvider;
use crate::processors::document::{DocumentFetcher, DocumentProcessor};
use crate::processors::json::{parse_json, JsonProcessor};
use crate::server::openapi::ApiDoc;

/// Application state
pub struct AppState {
    config: Arc<TranslatorConfig>,
    provider: Option<Arc<dyn TranslationProvider>>,
    fetcher: DocumentFetcher,
}

impl AppState {
    /// Build state with the DeepL client; a missing API key is tolerated until request time
    pub fn from_config(config: TranslatorConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let provider: Option<Arc<dyn TranslationProvider>> =
            match DeepLTranslator::new(config.clone()) {
                Ok(translator) => Some(Arc::new(translator)),
                Err(e) if e.kind() == ErrorKind::Config => {
                    warn!("{}; translation endpoints will return configuration errors", e);
                    None
                }
                Err(e) => return Err(e.into()),
            };

        Self::with_provider(config, provider)
    }

    /// Build state around an explicit provider (or none)
    pub fn with_provider(
        config: TranslatorConfig,
        provider: Option<Arc<dyn TranslationProvider>>,
    ) -> anyhow::Result<Self> {
        let fetcher = DocumentFetcher::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            provider,
            fetcher,
        })
    }

    fn provider(&self) -> Result<Arc<dyn TranslationProvider>, TranslationError> {
        self.provider
            .clone()
            .ok_or_else(|| TranslationError::config("DeepL API key not configured"))
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `ok`
    pub status: String,
    /// Package name
    pub service: String,
    /// Package version
    pub version: String,
    /// Whether a DeepL key is configured
    pub provider_configured: bool,
    /// RFC 3339 time of the check
    pub timestamp: String,
}

/// Metadata of a remote document
#[derive(Debug, Deserialize, ToSchema)]
pub struct DocumentMetadata {
    /// URL the document is downloaded from
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    /// Original file name
    pub object_name: String,
    /// Content hash, informational
    #[serde(default)]
    pub object_hash: Option<String>,
    /// File extension, e.g. `.pdf`
    pub object_extension: String,
    /// Size in bytes, informational
    #[serde(default)]
    pub object_size: Option<u64>,
}

/// Remote document translation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TranslateDocumentRequest {
    /// Document location and name
    pub object_metadata: DocumentMetadata,
    /// Target language code
    pub target_lang: String,
    /// Source language; detected when absent
    #[serde(default)]
    pub source_lang: Option<String>,
}

/// Query parameters of `/translate-json`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JsonTranslationQuery {
    /// Target language code, e.g. `DE`
    pub target_lang: String,
    /// Source language code; detected when absent
    #[serde(default)]
    pub source_lang: Option<String>,
}

/// Error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error message with its classification
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Error kind, e.g. `validation_error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// `invalid_request_error` or `api_error`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Error returned from handlers, rendered as [`ErrorResponse`]
#[derive(Debug)]
pub struct ApiError(TranslationError);

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        ApiError(TranslationError::validation(message))
    }
}

/// HTTP status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Config
        | ErrorKind::Retrieval
        | ErrorKind::Provider
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        let message = self.0.to_string();

        if status.is_server_error() {
            error!("Request failed ({}): {}", kind, message);
        } else {
            warn!("Rejected request ({}): {}", kind, message);
        }

        let error_type = match kind {
            ErrorKind::Validation => "invalid_request_error",
            _ => "api_error",
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                message,
                code: Some(kind.code().to_string()),
                kind: Some(error_type.to_string()),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "service"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider_configured: state.provider.is_some(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Download a remote document and translate it
#[utoipa::path(
    post,
    path = "/translate-document",
    request_body = TranslateDocumentRequest,
    responses(
        (status = 200, description = "Translated document as an attachment"),
        (status = 400, description = "Missing file URL or malformed request", body = ErrorResponse),
        (status = 500, description = "Download failure, missing credentials or provider error", body = ErrorResponse)
    ),
    tag = "translation"
)]
pub async fn translate_document(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranslateDocumentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let metadata = payload.object_metadata;

    debug!(
        "Document request: {} ({:?}, {:?} bytes, hash {:?})",
        metadata.object_name, metadata.object_extension, metadata.object_size, metadata.object_hash
    );

    let request = DocumentTranslationRequest {
        source: DocumentSource::Remote { url: metadata.id },
        file_name: metadata.object_name,
        file_extension: metadata.object_extension,
        target_lang: payload.target_lang,
        source_lang: payload.source_lang,
    }
    .validate()?;

    let processor = DocumentProcessor::new(state.provider()?, state.fetcher.clone());
    let document = processor.translate(request).await?;

    Ok(document_response(document))
}

/// Translate an uploaded document
#[utoipa::path(
    post,
    path = "/translate-document/upload",
    request_body(content = DocumentUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Translated document as an attachment"),
        (status = 400, description = "Missing file or language", body = ErrorResponse),
        (status = 500, description = "Missing credentials or provider error", body = ErrorResponse)
    ),
    tag = "translation"
)]
pub async fn translate_document_upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let form = read_upload_form(multipart).await?;

    let request = DocumentTranslationRequest {
        source: DocumentSource::Upload { bytes: form.file },
        file_name: form.file_name.unwrap_or_default(),
        file_extension: String::new(),
        target_lang: form.target_lang,
        source_lang: form.source_lang,
    }
    .validate()?;

    let processor = DocumentProcessor::new(state.provider()?, state.fetcher.clone());
    let document = processor.translate(request).await?;

    Ok(document_response(document))
}

/// Translate every string value of a JSON document, keeping keys and structure
#[utoipa::path(
    post,
    path = "/translate-json",
    params(JsonTranslationQuery),
    responses(
        (status = 200, description = "Same document with string values translated"),
        (status = 400, description = "Invalid JSON, nesting too deep or bad parameters", body = ErrorResponse),
        (status = 500, description = "Missing credentials or provider error", body = ErrorResponse)
    ),
    tag = "translation"
)]
pub async fn translate_json(
    State(state): State<Arc<AppState>>,
    query: Result<Query<JsonTranslationQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;

    let value = parse_json(&body, state.config.max_depth, "Invalid JSON")?;

    let request = JsonTranslationRequest {
        value,
        target_lang: validate_lang_code("target_lang", &query.target_lang)?,
        source_lang: validate_source_lang(query.source_lang.as_deref())?,
    };

    run_json_translation(&state, request).await
}

/// Translate an uploaded JSON file
#[utoipa::path(
    post,
    path = "/translate-json/upload",
    request_body(content = JsonUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Same document with string values translated"),
        (status = 400, description = "Invalid JSON file or parameters", body = ErrorResponse),
        (status = 500, description = "Missing credentials or provider error", body = ErrorResponse)
    ),
    tag = "translation"
)]
pub async fn translate_json_upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let form = read_upload_form(multipart).await?;

    let value = parse_json(&form.file, state.config.max_depth, "Invalid JSON file")?;

    let request = JsonTranslationRequest {
        value,
        target_lang: validate_lang_code("target_lang", &form.target_lang)?,
        source_lang: validate_source_lang(form.source_lang.as_deref())?,
    };

    run_json_translation(&state, request).await
}

async fn run_json_translation(
    state: &AppState,
    request: JsonTranslationRequest,
) -> Result<Json<serde_json::Value>, ApiError> {
    let processor = JsonProcessor::new(state.provider()?, &state.config);
    let translated = processor.translate_request(request).await?;
    Ok(Json(translated))
}

/// Report DeepL usage
#[utoipa::path(
    get,
    path = "/deepl-usage",
    responses(
        (status = 200, description = "Provider usage record"),
        (status = 500, description = "Missing credentials or provider error", body = ErrorResponse)
    ),
    tag = "usage"
)]
pub async fn deepl_usage(State(state): State<Arc<AppState>>) -> Result<Json<UsageInfo>, ApiError> {
    let usage = state.provider()?.get_usage().await?;
    Ok(Json(usage))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Fields of an upload form
struct UploadForm {
    file: Vec<u8>,
    file_name: Option<String>,
    target_lang: String,
    source_lang: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file = None;
    let mut file_name = None;
    let mut target_lang = None;
    let mut source_lang = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid file upload: {}", e)))?;
                file = Some(bytes.to_vec());
            }
            "target_lang" | "source_lang" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid form field {}: {}", name, e)))?;
                if name == "target_lang" {
                    target_lang = Some(value);
                } else {
                    source_lang = Some(value);
                }
            }
            other => debug!("Ignoring form field {}", other),
        }
    }

    Ok(UploadForm {
        file: file.ok_or_else(|| ApiError::validation("Missing form field: file"))?,
        file_name,
        target_lang: target_lang.ok_or_else(|| ApiError::validation("Missing form field: target_lang"))?,
        source_lang,
    })
}

fn document_response(document: TranslatedDocument) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(document.content_type)),
            (header::CONTENT_DISPOSITION, content_disposition(&document.file_name)),
        ],
        document.bytes,
    )
        .into_response()
}

/// `attachment; filename=<name>`: bare for token names, quoted for other
/// printable ASCII, RFC 5987 encoded otherwise
fn content_disposition(file_name: &str) -> HeaderValue {
    let value = if !file_name.is_empty() && file_name.bytes().all(is_token_byte) {
        format!("attachment; filename={}", file_name)
    } else if file_name.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("attachment; filename=\"{}\"", escaped)
    } else {
        format!(
            "attachment; filename*=UTF-8''{}",
            utf8_percent_encode(file_name, NON_ALPHANUMERIC)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// RFC 7230 `tchar`
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Build the router around `state`
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health_check))
        .route("/translate-document", post(translate_document))
        .route("/translate-document/upload", post(translate_document_upload))
        .route("/translate-json", post(translate_json))
        .route("/translate-json/upload", post(translate_json_upload))
        .route("/deepl-usage", get(deepl_usage))
        .route("/openapi.json", get(openapi_json))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server
pub async fn run_server(host: String, port: u16, config: TranslatorConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    // Bind address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
