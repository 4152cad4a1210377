//! Core data models for translation

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::core::errors::{Result, TranslationError};

/// Content type returned for translated documents
pub const DOCUMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix prepended to translated document names
pub const TRANSLATED_PREFIX: &str = "translated_";

/// Single text translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,
    /// Source language; detected by the provider when absent
    pub source_lang: Option<String>,
    /// Target language code
    pub target_lang: String,
}

impl TranslationRequest {
    /// Request for `text` into `target_lang`
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: None,
            target_lang: target_lang.into(),
        }
    }

    /// Set or clear the source language
    pub fn with_source_lang(mut self, source_lang: Option<impl Into<String>>) -> Self {
        self.source_lang = source_lang.map(Into::into);
        self
    }
}

/// Structured JSON translation request
#[derive(Debug, Clone)]
pub struct JsonTranslationRequest {
    /// Document whose string leaves are translated
    pub value: serde_json::Value,
    /// Target language code
    pub target_lang: String,
    /// Source language; detected when absent
    pub source_lang: Option<String>,
}

/// Where the bytes of a document come from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Fetch over HTTP GET
    Remote {
        /// Document URL
        url: String,
    },
    /// Bytes uploaded with the request
    Upload {
        /// Uploaded content
        bytes: Vec<u8>,
    },
}

/// Whole-document translation request
#[derive(Debug, Clone)]
pub struct DocumentTranslationRequest {
    /// Where the document bytes come from
    pub source: DocumentSource,
    /// Original file name
    pub file_name: String,
    /// File extension, with or without the leading dot
    pub file_extension: String,
    /// Target language code
    pub target_lang: String,
    /// Source language; detected when absent
    pub source_lang: Option<String>,
}

impl DocumentTranslationRequest {
    /// Check required fields and normalize languages and extension
    pub fn validate(mut self) -> Result<Self> {
        match &self.source {
            DocumentSource::Remote { url } if url.trim().is_empty() => {
                return Err(TranslationError::validation(
                    "Missing file URL in object metadata",
                ));
            }
            DocumentSource::Upload { bytes } if bytes.is_empty() => {
                return Err(TranslationError::validation("Uploaded file is empty"));
            }
            _ => {}
        }

        self.target_lang = validate_lang_code("target_lang", &self.target_lang)?;
        self.source_lang = validate_source_lang(self.source_lang.as_deref())?;

        let mut extension = normalize_extension(&self.file_extension);
        if extension.is_empty() {
            extension = std::path::Path::new(&self.file_name)
                .extension()
                .map(|ext| normalize_extension(&ext.to_string_lossy()))
                .unwrap_or_default();
        }
        if extension.is_empty() {
            return Err(TranslationError::validation("Missing file extension"));
        }
        self.file_extension = extension;

        Ok(self)
    }

    /// Name of the translated output file
    pub fn output_file_name(&self) -> String {
        if self.file_name.trim().is_empty() {
            format!("{}document.{}", TRANSLATED_PREFIX, self.file_extension)
        } else {
            format!("{}{}", TRANSLATED_PREFIX, self.file_name)
        }
    }
}

/// Document handed to the provider
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Document content
    pub bytes: Vec<u8>,
    /// Original file name
    pub file_name: String,
    /// Lowercase extension without the leading dot
    pub extension: String,
}

impl DocumentUpload {
    /// File name announced to the provider, which uses it to detect the format
    pub fn upload_name(&self) -> String {
        let suffix = format!(".{}", self.extension);
        if self.file_name.to_lowercase().ends_with(&suffix) {
            self.file_name.clone()
        } else if self.file_name.is_empty() {
            format!("document{}", suffix)
        } else {
            format!("{}{}", self.file_name, suffix)
        }
    }
}

/// Translated document ready to be returned
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    /// `translated_<name>`
    pub file_name: String,
    /// Response content type
    pub content_type: &'static str,
    /// Translated content
    pub bytes: Vec<u8>,
}

/// Provider usage record, passed through without interpretation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    /// Characters translated in the current period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_count: Option<u64>,
    /// Character quota for the current period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_limit: Option<u64>,
    /// Any other fields the provider reports
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Normalize a file extension: strip the leading dot, lowercase
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Validate a language code such as `DE`, `en-GB` or `pt-BR`
pub fn validate_lang_code(field: &str, code: &str) -> Result<String> {
    static LANG_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = LANG_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,4})?$").ok())
        .as_ref()
        .ok_or_else(|| TranslationError::InternalError("language pattern failed to compile".into()))?;

    let code = code.trim();
    if code.is_empty() {
        return Err(TranslationError::validation(format!("Missing {}", field)));
    }
    if !re.is_match(code) {
        return Err(TranslationError::validation(format!(
            "Invalid {}: {:?}",
            field, code
        )));
    }

    Ok(code.to_string())
}

/// Validate an optional source language; blank counts as absent
pub fn validate_source_lang(code: Option<&str>) -> Result<Option<String>> {
    match code.map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => validate_lang_code("source_lang", code).map(Some),
    }
}
