//! EU Farmbook translation service
//!
//! Translates documents and JSON payloads through the DeepL API, either as an
//! HTTP microservice or from the command line.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;
pub mod processors;
pub mod server;

// Re-export key types for convenience
pub use crate::core::{
    client::DeepLTranslator,
    config::TranslatorConfig,
    errors::{ErrorKind, TranslationError},
    models::{
        DocumentSource, DocumentTranslationRequest, JsonTranslationRequest, TranslatedDocument,
        TranslationRequest, UsageInfo,
    },
    provider::TranslationProvider,
};

pub use crate::processors::{
    document::{DocumentFetcher, DocumentProcessor},
    json::JsonProcessor,
};

pub use crate::server::api::{create_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
