//! Translation provider abstraction

use async_trait::async_trait;

use crate::core::errors::Result;
use crate::core::models::{DocumentUpload, TranslationRequest, UsageInfo};

/// Remote machine-translation capability.
///
/// Implementations must report every failure of the remote service as
/// [`TranslationError::ProviderError`](crate::core::errors::TranslationError::ProviderError).
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate a single piece of text
    async fn translate_text(&self, request: &TranslationRequest) -> Result<String>;

    /// Translate a whole document, returning the translated bytes
    async fn translate_document(
        &self,
        document: DocumentUpload,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<Vec<u8>>;

    /// Current usage and quota
    async fn get_usage(&self) -> Result<UsageInfo>;
}
