//! Main entry point for the farmbook-translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farmbook_translator::cli::commands::{self, Commands};
use farmbook_translator::TranslatorConfig;

/// EU Farmbook translation service - documents and JSON through DeepL
#[derive(Parser, Debug)]
#[command(name = "farmbook-translator", version, about, long_about = None)]
struct Args {
    /// DeepL API key (optional, defaults to DEEPL_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Configuration file (JSON, YAML or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Maximum concurrent provider requests
    #[arg(long)]
    max_concurrent: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let debug_server = matches!(args.command, Some(Commands::Server { debug: true, .. }));
    let log_level = if args.verbose || debug_server { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={},tower_http={}", env!("CARGO_CRATE_NAME"), log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => TranslatorConfig::from_file(path)?,
        None => TranslatorConfig::from_env()?,
    };

    // Override config with CLI args if provided
    if let Some(api_key) = args.api_key {
        config.api_key = Some(api_key);
    }
    if let Some(max_concurrent) = args.max_concurrent {
        config.max_concurrent = max_concurrent;
    }

    match args.command {
        Some(Commands::Server { host, port, .. }) => {
            commands::handle_server(config, host, port).await?;
        }
        Some(Commands::Json {
            file,
            output,
            source_lang,
            target_lang,
            recursive,
        }) => {
            commands::handle_json(config, file, output, source_lang, target_lang, recursive).await?;
        }
        Some(Commands::Document {
            file,
            output,
            source_lang,
            target_lang,
        }) => {
            commands::handle_document(config, file, output, source_lang, target_lang).await?;
        }
        Some(Commands::Usage) => {
            commands::handle_usage(config).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
