//! DeepL API client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{DocumentUpload, TranslationRequest, UsageInfo};
use crate::core::provider::TranslationProvider;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<TextTranslation>,
}

#[derive(Debug, Deserialize)]
struct TextTranslation {
    text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

/// Handle returned by the document upload endpoint
#[derive(Debug, Deserialize)]
struct DocumentHandle {
    document_id: String,
    document_key: String,
}

#[derive(Debug, Deserialize)]
struct DocumentStatus {
    status: String,
    #[serde(default)]
    seconds_remaining: Option<u64>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Async DeepL client with bounded concurrency
#[derive(Debug, Clone)]
pub struct DeepLTranslator {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
    api_key: String,
    endpoint: String,
    semaphore: Arc<Semaphore>,
}

impl DeepLTranslator {
    /// Create a new DeepL client; fails with a config error when no key is set
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TranslationError::config(e.to_string()))?;
        let api_key = config.require_api_key()?.to_string();
        let endpoint = config.endpoint();

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

        info!("DeepL client ready at {}", endpoint);

        Ok(Self {
            client,
            config: Arc::new(config),
            api_key,
            endpoint,
            semaphore,
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = TranslatorConfig::from_env()?;
        Self::new(config)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.endpoint, path)
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    /// One permit per outbound request; document jobs release it between polls
    async fn permit(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|e| TranslationError::InternalError(e.to_string()))
    }

    /// Decode a successful JSON response or turn the failure into a provider error
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TranslationError::provider(None, format!("Invalid response: {}", e)))
    }

    async fn upload_document(
        &self,
        document: DocumentUpload,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<DocumentHandle> {
        let upload_name = document.upload_name();
        debug!("Uploading {} ({} bytes)", upload_name, document.bytes.len());

        let part = reqwest::multipart::Part::bytes(document.bytes).file_name(upload_name);
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("target_lang", target_lang.to_uppercase());
        if let Some(source_lang) = source_lang {
            form = form.text("source_lang", source_lang.to_uppercase());
        }

        let _permit = self.permit().await?;
        let response = self
            .client
            .post(self.url("document"))
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        Self::read_json(response).await
    }

    async fn wait_for_document(&self, handle: &DocumentHandle) -> Result<()> {
        let poll_interval = Duration::from_millis(self.config.document_poll_interval_ms);
        let deadline = Instant::now() + Duration::from_millis(self.config.document_timeout_ms);

        loop {
            let status: DocumentStatus = {
                let _permit = self.permit().await?;
                let response = self
                    .client
                    .post(self.url(&format!("document/{}", handle.document_id)))
                    .header("Authorization", self.auth_header())
                    .json(&serde_json::json!({ "document_key": handle.document_key }))
                    .send()
                    .await
                    .map_err(network_error)?;
                Self::read_json(response).await?
            };

            match status.status.as_str() {
                "done" => return Ok(()),
                "error" => {
                    let message = status
                        .error_message
                        .unwrap_or_else(|| "document translation failed".to_string());
                    return Err(TranslationError::provider(None, message));
                }
                other => debug!(
                    "Document {} is {}, ~{:?}s remaining",
                    handle.document_id, other, status.seconds_remaining
                ),
            }

            if Instant::now() + poll_interval > deadline {
                return Err(TranslationError::provider(
                    None,
                    format!(
                        "document translation did not finish within {} ms",
                        self.config.document_timeout_ms
                    ),
                ));
            }
            sleep(poll_interval).await;
        }
    }

    async fn download_document(&self, handle: &DocumentHandle) -> Result<Vec<u8>> {
        let _permit = self.permit().await?;
        let response = self
            .client
            .post(self.url(&format!("document/{}/result", handle.document_id)))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "document_key": handle.document_key }))
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let bytes = response.bytes().await.map_err(network_error)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TranslationProvider for DeepLTranslator {
    async fn translate_text(&self, request: &TranslationRequest) -> Result<String> {
        let _permit = self.permit().await?;

        let mut body = serde_json::json!({
            "text": [request.text],
            "target_lang": request.target_lang.to_uppercase(),
        });
        if let Some(source_lang) = &request.source_lang {
            body["source_lang"] = serde_json::json!(source_lang.to_uppercase());
        }

        let response = self
            .client
            .post(self.url("translate"))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let parsed: TranslateResponse = Self::read_json(response).await?;
        let translation = parsed.translations.into_iter().next().ok_or_else(|| {
            TranslationError::provider(None, "No translation in response")
        })?;

        debug!(
            "Translated {} chars (detected {:?})",
            request.text.len(),
            translation.detected_source_language
        );

        Ok(translation.text)
    }

    async fn translate_document(
        &self,
        document: DocumentUpload,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<Vec<u8>> {
        let handle = self.upload_document(document, target_lang, source_lang).await?;
        info!("Document {} uploaded, waiting for translation", handle.document_id);

        self.wait_for_document(&handle).await?;
        let bytes = self.download_document(&handle).await?;

        info!("Document {} translated ({} bytes)", handle.document_id, bytes.len());
        Ok(bytes)
    }

    async fn get_usage(&self) -> Result<UsageInfo> {
        let _permit = self.permit().await?;
        let response = self
            .client
            .get(self.url("usage"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(network_error)?;

        Self::read_json(response).await
    }
}

fn network_error(e: reqwest::Error) -> TranslationError {
    if e.is_timeout() {
        TranslationError::provider(None, "Request timeout")
    } else {
        TranslationError::provider(None, e.to_string())
    }
}

/// Map a non-2xx DeepL response to a provider error
async fn error_from_response(response: reqwest::Response) -> TranslationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    // DeepL error bodies look like {"message": "..."}
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);

    let base = match status {
        403 => "Authorization failure, check auth_key".to_string(),
        429 => "Too many requests, DeepL servers are currently experiencing high load".to_string(),
        456 => "Quota exceeded, the character limit has been reached".to_string(),
        _ => format!("HTTP {}", status),
    };

    let message = if detail.trim().is_empty() {
        base
    } else {
        format!("{}, message: {}", base, detail.trim())
    };

    TranslationError::provider(Some(status), message)
}
