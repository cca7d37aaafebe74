//! DevAssist Upload CLI
//!
//! Drives the upload pipeline from files on disk:
//! - `upload`: run a batch through a category zone and print the session
//! - `extract`: print the text extracted from a single file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use devassist_common::{config::AppConfig, metrics, telemetry, VERSION};
use devassist_upload::{
    create_extractor, DocumentCategory, IncomingFile, UploadSession, UploadZone, ZoneConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "devassist-upload", version, about = "Upload documents and extract their text")]
struct Cli {
    /// Configuration file, replacing the layered `config/` directory
    #[arg(long, global = true)]
    config: Option<String>,

    /// Text extractor: `document` or `mock`
    #[arg(long, global = true, default_value = "document")]
    extractor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run files through an upload zone and print the resulting session
    Upload {
        /// specification, proposal or supplementary
        #[arg(long, short)]
        category: DocumentCategory,

        /// Override the configured file limit for the category
        #[arg(long)]
        max_files: Option<usize>,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Extract text from a single file
    Extract { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    telemetry::init_tracing(&config.observability)?;
    metrics::register_metrics();

    info!("Starting DevAssist upload v{}", VERSION);

    match cli.command {
        Command::Upload {
            category,
            max_files,
            paths,
        } => upload(&config, &cli.extractor, category, max_files, &paths).await,
        Command::Extract { path } => extract(&config, &cli.extractor, &path).await,
    }
}

async fn load_files(paths: &[PathBuf]) -> anyhow::Result<Vec<IncomingFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = IncomingFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

async fn upload(
    config: &AppConfig,
    extractor: &str,
    category: DocumentCategory,
    max_files: Option<usize>,
    paths: &[PathBuf],
) -> anyhow::Result<()> {
    let files = load_files(paths).await?;

    let mut zone_config = ZoneConfig::for_category(config, category);
    if max_files.is_some() {
        zone_config = zone_config.with_max_files(max_files);
    }

    let session = Arc::new(UploadSession::new());
    let zone = UploadZone::new(
        category,
        zone_config,
        create_extractor(extractor, &config.extraction),
        session.clone(),
    )?;

    info!(category = %category, title = category.title(), files = files.len(), "Uploading");

    match zone.accept_files(&session.files(category), files).await {
        Ok(report) => {
            if let Some(banner) = zone.error() {
                eprintln!("{}", banner.user_message());
            }
            info!(
                added = report.added.len(),
                failed = report.failed_extractions.len(),
                rejected = report.rejected.len(),
                "Upload complete"
            );
        }
        Err(e) => {
            error!(code = ?e.code(), error = %e, "Upload refused");
            eprintln!("{}", serde_json::to_string_pretty(&e.report())?);
            bail!(e);
        }
    }

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

async fn extract(config: &AppConfig, extractor: &str, path: &Path) -> anyhow::Result<()> {
    let file = IncomingFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let extractor = create_extractor(extractor, &config.extraction);
    let text = extractor
        .extract_text(&file)
        .await
        .with_context(|| format!("Text extraction failed for {}", file.name()))?;

    println!("{}", text);
    Ok(())
}
