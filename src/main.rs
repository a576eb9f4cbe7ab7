use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;

use portfolio_rag::config::Settings;
use portfolio_rag::ingest::Ingestor;
use portfolio_rag::server::{self, AppState};
use portfolio_rag::services::{Services, StoreAccess};

/// Retrieval-augmented chat backend for a portfolio site
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the chat endpoint (default)
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },
    /// Chunk, embed and store the documents of a data directory
    Ingest {
        /// Directory holding resume.md and projects/*.md
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Read one stored row and print what it looks like
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Load configuration from environment
    let settings = Settings::from_env().context("Invalid configuration")?;

    match args.command.unwrap_or(Command::Serve {
        bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
    }) {
        Command::Serve { bind } => run_server(settings, bind).await,
        Command::Ingest { data_dir } => run_ingest(settings, data_dir).await,
        Command::Probe => run_probe(settings).await,
    }
}

async fn run_server(settings: Settings, bind: SocketAddr) -> Result<()> {
    let missing = settings.missing_required();
    if !missing.is_empty() {
        // Keep serving GET; POST reports the missing names
        warn!("Missing configuration: {}", missing.join(", "));
    }

    info!(
        "Using {} with {} / {}, store {}",
        settings.provider.as_str(),
        settings.embedding_model,
        settings.chat_model,
        settings.store.as_str()
    );

    let service = Services::from_settings(&settings, StoreAccess::Read)?.into_chat_service(settings);
    server::serve(bind, AppState::new(service)).await
}

async fn run_ingest(settings: Settings, data_dir: PathBuf) -> Result<()> {
    let missing = settings.missing_for_writes();
    if !missing.is_empty() {
        return Err(anyhow::anyhow!(
            "Missing configuration: {}",
            missing.join(", ")
        ));
    }

    info!("Ingesting documents from {}", data_dir.display());

    let services = Services::from_settings(&settings, StoreAccess::Write)?;
    let ingestor = Ingestor::new(services.embedder, services.store, settings.embedding_dim);
    ingestor
        .ingest_dir(&data_dir)
        .await
        .context("Ingestion failed")?;

    Ok(())
}

async fn run_probe(settings: Settings) -> Result<()> {
    let services = Services::from_settings(&settings, StoreAccess::Read)?;
    let report = services.store.probe().await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.ok {
        return Err(anyhow::anyhow!("Probe of {} failed", services.store.backend()));
    }
    Ok(())
}
