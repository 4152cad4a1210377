//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::client::DeepLTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::provider::TranslationProvider;

/// Commands for the translation service
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP API server
    Server {
        /// Bind address (default: 0.0.0.0)
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Listen port (default: 8000)
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Translate the string values of JSON files
    Json {
        /// Input file or directory (required)
        #[arg(short, long)]
        file: PathBuf,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language (auto-detect if not specified)
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language
        #[arg(short, long)]
        target_lang: String,

        /// Recursively translate subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Translate a document (PDF, DOCX, PPTX, ...)
    Document {
        /// Input file (required)
        #[arg(short, long)]
        file: PathBuf,

        /// Output file (default: translated_<name> beside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language (auto-detect if not specified)
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language
        #[arg(short, long)]
        target_lang: String,
    },

    /// Show DeepL character usage
    Usage,
}

fn provider(config: &TranslatorConfig) -> anyhow::Result<Arc<dyn TranslationProvider>> {
    Ok(Arc::new(DeepLTranslator::new(config.clone())?))
}

/// Output path for one JSON input
fn json_output_path(input: &Path, root: &Path, output: &Path, single: bool) -> PathBuf {
    if single {
        return output.to_path_buf();
    }
    match input.strip_prefix(root) {
        Ok(relative) => output.join(relative),
        Err(_) => output.join(input.file_name().unwrap_or_default()),
    }
}

/// Handle JSON translation command
pub async fn handle_json(
    config: TranslatorConfig,
    file: PathBuf,
    output: Option<PathBuf>,
    source_lang: Option<String>,
    target_lang: String,
    recursive: bool,
) -> anyhow::Result<()> {
    use crate::core::models::{validate_lang_code, validate_source_lang};
    use crate::processors::json::JsonProcessor;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tracing::info;

    let start_time = Instant::now();
    let target_lang = validate_lang_code("target_lang", &target_lang)?;
    let source_lang = validate_source_lang(source_lang.as_deref())?;

    let single = !file.is_dir();
    let output = output.unwrap_or_else(|| {
        if single {
            let name = file.file_name().unwrap_or_default().to_string_lossy();
            file.with_file_name(format!("translated_{}", name))
        } else {
            file.join("translated")
        }
    });

    info!("Starting JSON translation");
    info!("Input: {}", file.display());
    info!("Output: {}", output.display());
    info!("Target language: {}", target_lang);
    info!("Recursive: {}", recursive);

    let processor = JsonProcessor::new(provider(&config)?, &config);

    let files = if single {
        vec![file.clone()]
    } else {
        processor
            .find_files(&file, recursive)?
            .into_iter()
            .filter(|path| !path.starts_with(&output))
            .collect()
    };

    if files.is_empty() {
        anyhow::bail!("No JSON files found");
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("=>-"),
    );

    let mut processed = 0;
    let mut failed = 0;

    for file_path in files {
        pb.set_message(format!("Processing: {}", file_path.display()));
        let target = json_output_path(&file_path, &file, &output, single);

        match processor
            .translate_file(&file_path, &target, &target_lang, source_lang.as_deref())
            .await
        {
            Ok(_) => processed += 1,
            Err(e) => {
                failed += 1;
                pb.println(format!("Error processing {}: {}", file_path.display(), e));
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Completed");

    let duration = start_time.elapsed();
    info!(
        "Completed: {} processed, {} failed in {:?}",
        processed, failed, duration
    );

    println!("\n✅ Translation completed!");
    println!("   Processed: {}", processed);
    println!("   Failed: {}", failed);
    println!("   Time: {:?}", duration);

    Ok(())
}

/// Handle document translation command
pub async fn handle_document(
    config: TranslatorConfig,
    file: PathBuf,
    output: Option<PathBuf>,
    source_lang: Option<String>,
    target_lang: String,
) -> anyhow::Result<()> {
    use crate::processors::document::{DocumentFetcher, DocumentProcessor};
    use indicatif::ProgressBar;
    use std::time::{Duration, Instant};
    use tracing::info;

    let start_time = Instant::now();
    info!("Translating document {} to {}", file.display(), target_lang);

    let processor = DocumentProcessor::new(provider(&config)?, DocumentFetcher::new(&config)?);

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Translating {}", file.display()));

    let result = processor
        .translate_file(&file, output.as_deref(), &target_lang, source_lang.as_deref())
        .await;
    spinner.finish_and_clear();
    let written = result?;

    println!("\n✅ Document translated!");
    println!("   Output: {}", written.display());
    println!("   Time: {:?}", start_time.elapsed());

    Ok(())
}

/// Handle usage command
pub async fn handle_usage(config: TranslatorConfig) -> anyhow::Result<()> {
    let usage = provider(&config)?.get_usage().await?;

    if let (Some(count), Some(limit)) = (usage.character_count, usage.character_limit) {
        let percent = if limit > 0 {
            count as f64 * 100.0 / limit as f64
        } else {
            0.0
        };
        println!("Characters: {} of {} ({:.1}%)", count, limit, percent);
    }
    println!("{}", serde_json::to_string_pretty(&usage)?);

    Ok(())
}

/// Handle server command
pub async fn handle_server(config: TranslatorConfig, host: String, port: u16) -> anyhow::Result<()> {
    use crate::server::api::run_server;
    use tracing::{debug, info};

    debug!(
        "Limits: max_concurrent={}, max_depth={}, max_upload_bytes={}",
        config.max_concurrent, config.max_depth, config.max_upload_bytes
    );

    info!("Starting HTTP server on {}:{}", host, port);
    println!("🚀 Server starting on http://{}:{}", host, port);
    println!("📄 OpenAPI document: http://{}:{}/openapi.json", host, port);

    run_server(host, port, config).await?;

    Ok(())
}
