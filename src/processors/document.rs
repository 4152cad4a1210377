//! Document retrieval and whole-document translation

use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{
    DocumentSource, DocumentTranslationRequest, DocumentUpload, TranslatedDocument,
    DOCUMENT_CONTENT_TYPE,
};
use crate::core::provider::TranslationProvider;

/// Downloads remote documents into memory
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl DocumentFetcher {
    /// Fetcher honouring the request timeout and size limit of `config`
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            max_bytes: config.max_upload_bytes,
        })
    }

    /// GET `url`; anything but `200 OK` is a retrieval error
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| TranslationError::validation(format!("Invalid file URL {:?}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TranslationError::validation(format!(
                "Unsupported file URL scheme: {}",
                parsed.scheme()
            )));
        }

        debug!("Downloading {}", parsed);
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| TranslationError::retrieval(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TranslationError::retrieval(format!("HTTP {}", status.as_u16())));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(self.too_large(length as usize));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TranslationError::retrieval(e.to_string()))?;
        if bytes.len() > self.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        Ok(bytes.to_vec())
    }

    fn too_large(&self, size: usize) -> TranslationError {
        TranslationError::retrieval(format!(
            "document is {} bytes, limit is {}",
            size, self.max_bytes
        ))
    }
}

/// Fetches or accepts a document and hands it to the provider
#[derive(Clone)]
pub struct DocumentProcessor {
    provider: Arc<dyn TranslationProvider>,
    fetcher: DocumentFetcher,
}

impl DocumentProcessor {
    /// Processor over `provider` and `fetcher`
    pub fn new(provider: Arc<dyn TranslationProvider>, fetcher: DocumentFetcher) -> Self {
        Self { provider, fetcher }
    }

    /// Translate a document, returning `translated_<name>` and the translated bytes
    pub async fn translate(&self, request: DocumentTranslationRequest) -> Result<TranslatedDocument> {
        let request = request.validate()?;
        let file_name = request.output_file_name();

        let bytes = match request.source {
            DocumentSource::Remote { url } => self.fetcher.fetch(&url).await?,
            DocumentSource::Upload { bytes } => bytes,
        };

        info!(
            "Translating document {} ({} bytes, {}) to {}",
            request.file_name,
            bytes.len(),
            request.file_extension,
            request.target_lang
        );

        let upload = DocumentUpload {
            bytes,
            file_name: request.file_name,
            extension: request.file_extension,
        };
        let translated = self
            .provider
            .translate_document(upload, &request.target_lang, request.source_lang.as_deref())
            .await?;

        Ok(TranslatedDocument {
            file_name,
            content_type: DOCUMENT_CONTENT_TYPE,
            bytes: translated,
        })
    }

    /// Translate a local file; output defaults to `translated_<name>` beside the input
    pub async fn translate_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<PathBuf> {
        let bytes = tokio::fs::read(input).await.map_err(|e| {
            TranslationError::validation(format!("Cannot read {}: {}", input.display(), e))
        })?;
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let document = self
            .translate(DocumentTranslationRequest {
                source: DocumentSource::Upload { bytes },
                file_name,
                file_extension: String::new(),
                target_lang: target_lang.to_string(),
                source_lang: source_lang.map(str::to_string),
            })
            .await?;

        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.with_file_name(&document.file_name));
        tokio::fs::write(&output, &document.bytes).await?;

        Ok(output)
    }
}
