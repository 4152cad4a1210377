//! Configuration management

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::core::errors::{Result, TranslationError};

/// DeepL endpoint for free-tier keys (suffix `:fx`)
pub const DEEPL_FREE_ENDPOINT: &str = "https://api-free.deepl.com";

/// DeepL endpoint for pro keys
pub const DEEPL_PRO_ENDPOINT: &str = "https://api.deepl.com";

/// Configuration for translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// DeepL authentication key (`DEEPL_API_KEY`)
    pub api_key: Option<String>,
    /// Base URL override; derived from the key when unset
    pub api_endpoint: Option<String>,
    /// Timeout for each outbound HTTP request
    pub timeout_ms: u64,
    /// Maximum provider requests in flight
    pub max_concurrent: usize,
    /// Maximum JSON nesting depth accepted for translation
    pub max_depth: usize,
    /// Maximum request body and downloaded document size
    pub max_upload_bytes: usize,
    /// Delay between document status polls
    pub document_poll_interval_ms: u64,
    /// Overall deadline for one document translation
    pub document_timeout_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: None,
            timeout_ms: 30_000,
            max_concurrent: 8,
            max_depth: 1000,
            max_upload_bytes: 30 * 1024 * 1024,
            document_poll_interval_ms: 1000,
            document_timeout_ms: 300_000,
        }
    }
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a JSON, YAML or TOML file, then overlay environment variables
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let mut config: Self = settings
            .try_deserialize()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.apply_env()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Override fields with any environment variables that are set
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(key) = std::env::var("DEEPL_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(endpoint) = std::env::var("DEEPL_API_ENDPOINT") {
            self.api_endpoint = Some(endpoint);
        }
        if let Some(v) = env_parse("REQUEST_TIMEOUT_MS")? {
            self.timeout_ms = v;
        }
        if let Some(v) = env_parse("MAX_CONCURRENT")? {
            self.max_concurrent = v;
        }
        if let Some(v) = env_parse("MAX_JSON_DEPTH")? {
            self.max_depth = v;
        }
        if let Some(v) = env_parse("MAX_UPLOAD_BYTES")? {
            self.max_upload_bytes = v;
        }
        if let Some(v) = env_parse("DOCUMENT_POLL_INTERVAL_MS")? {
            self.document_poll_interval_ms = v;
        }
        if let Some(v) = env_parse("DOCUMENT_TIMEOUT_MS")? {
            self.document_timeout_ms = v;
        }

        self.api_key = self
            .api_key
            .take()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent == 0 {
            return Err(anyhow::anyhow!("max_concurrent must be greater than 0"));
        }

        if self.max_depth == 0 {
            return Err(anyhow::anyhow!("max_depth must be greater than 0"));
        }

        if self.timeout_ms == 0 {
            return Err(anyhow::anyhow!("timeout_ms must be greater than 0"));
        }

        if self.document_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("document_poll_interval_ms must be greater than 0"));
        }

        let endpoint = self.endpoint();
        let url = reqwest::Url::parse(&endpoint)
            .with_context(|| format!("invalid API endpoint: {}", endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!("API endpoint must be http(s): {}", endpoint));
        }

        if self.api_key.is_none() {
            warn!("DEEPL_API_KEY is not set, translation requests will fail");
        }

        Ok(())
    }

    /// Base URL of the DeepL API, without the `/v2` suffix
    pub fn endpoint(&self) -> String {
        if let Some(endpoint) = &self.api_endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }

        match &self.api_key {
            Some(key) if key.ends_with(":fx") => DEEPL_FREE_ENDPOINT.to_string(),
            _ => DEEPL_PRO_ENDPOINT.to_string(),
        }
    }

    /// API key, or a config error when absent
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| TranslationError::config("DeepL API key not configured"))
    }
}
