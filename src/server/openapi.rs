//! OpenAPI description of the HTTP API

use utoipa::{OpenApi, ToSchema};

use crate::server::api;

/// Multipart form of `/translate-document/upload`
#[derive(ToSchema)]
pub struct DocumentUploadForm {
    /// Document to translate; its file name decides the format
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Target language code
    pub target_lang: String,
    /// Source language; detected when absent
    pub source_lang: Option<String>,
}

/// Multipart form of `/translate-json/upload`
#[derive(ToSchema)]
pub struct JsonUploadForm {
    /// UTF-8 JSON document
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Target language code
    pub target_lang: String,
    /// Source language; detected when absent
    pub source_lang: Option<String>,
}

/// OpenAPI document served at `/openapi.json`
#[derive(OpenApi)]
#[openapi(
    info(
        title = "EU Farmbook Translation Service",
        description = "Translation of documents and JSON files using the DeepL API"
    ),
    paths(
        api::health_check,
        api::translate_document,
        api::translate_document_upload,
        api::translate_json,
        api::translate_json_upload,
        api::deepl_usage
    ),
    components(schemas(
        api::HealthResponse,
        api::DocumentMetadata,
        api::TranslateDocumentRequest,
        api::ErrorResponse,
        api::ErrorDetail,
        DocumentUploadForm,
        JsonUploadForm
    )),
    tags(
        (name = "translation", description = "Document and JSON translation"),
        (name = "usage", description = "Provider quota"),
        (name = "service", description = "Service status")
    )
)]
pub struct ApiDoc;
