mod parse_html;
mod providers;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pantry_core::ai::ProviderKind;
use pantry_core::{
    ExtractionConfig, ExtractionFailure, ExtractionOrchestrator, ExtractionRequest, HttpFetcher,
    ImageInput, UnsupportedVideoProcessor,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Extract recipes from web pages, videos and photos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a recipe from a URL
    Extract {
        url: String,
        /// Allergen to flag in keywords (repeatable)
        #[arg(long = "allergy")]
        allergies: Vec<String>,
        /// Skip structured extraction and use the AI provider directly
        #[arg(long)]
        ai_only: bool,
    },
    /// Run the structured extractors over a saved HTML file
    ParseHtml {
        file: PathBuf,
        /// URL the page was saved from
        #[arg(long)]
        url: String,
    },
    /// Extract a recipe from one or more photos of a single recipe
    Photos {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long = "allergy")]
        allergies: Vec<String>,
    },
    /// List the supported AI providers
    Providers,
    /// List chat models offered by a provider
    Models {
        /// Provider to query (default: PANTRY_AI_PROVIDER)
        #[arg(long)]
        provider: Option<ProviderKind>,
    },
    /// Show what the configured models accept
    Probe,
}

fn init_logging() {
    // stdout carries the JSON result
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            url,
            allergies,
            ai_only,
        } => {
            let request = ExtractionRequest::url(url)
                .with_allergies(allergies)
                .with_force_ai(ai_only);
            extract(request).await?;
        }
        Commands::ParseHtml { file, url } => {
            parse_html::parse_html(&file, &url)?;
        }
        Commands::Photos { files, allergies } => {
            let images = files
                .iter()
                .map(|f| load_image(f))
                .collect::<Result<Vec<_>>>()?;
            extract(ExtractionRequest::images(images).with_allergies(allergies)).await?;
        }
        Commands::Providers => {
            providers::list_providers()?;
        }
        Commands::Models { provider } => {
            providers::list_models(&load_config()?, provider).await?;
        }
        Commands::Probe => {
            providers::probe(&load_config()?).await?;
        }
    }

    Ok(())
}

fn load_config() -> Result<ExtractionConfig> {
    ExtractionConfig::from_env().context("Invalid PANTRY_* configuration")
}

async fn extract(request: ExtractionRequest) -> Result<()> {
    let config = load_config()?;
    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
    let orchestrator =
        ExtractionOrchestrator::with_defaults(Arc::new(fetcher), Arc::new(UnsupportedVideoProcessor));

    match orchestrator.extract(&request, &config).await {
        Ok(success) => {
            println!("{}", serde_json::to_string_pretty(&success)?);
            Ok(())
        }
        Err(e) => {
            print_failure(&e)?;
            Err(anyhow::anyhow!("Failed to extract recipe: {}", e))
        }
    }
}

fn print_failure(failure: &ExtractionFailure) -> Result<()> {
    let error_json = serde_json::json!({
        "error": failure.to_string(),
        "attempts": failure.attempts(),
    });
    println!("{}", serde_json::to_string_pretty(&error_json)?);
    Ok(())
}

fn load_image(path: &Path) -> Result<ImageInput> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;
    Ok(ImageInput::from_bytes(mime_type_for(path), &bytes))
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}
