//! nodeload binary
//!
//! Seeds an in-memory store from a fixture file and answers
//! newline-delimited JSON load requests, one result line per request.
//!
//! # Usage
//!
//! ```bash
//! # Requests from a file
//! nodeload --config nodeload.yaml --fixtures fixtures.yaml --requests loads.jsonl
//!
//! # Requests from stdin, configuration from the environment only
//! NODELOAD_LOGGING__LEVEL=debug nodeload --fixtures fixtures.json < loads.jsonl
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{stdin, stdout, BufReader};
use tracing::info;

use nodeload_server::app::{build_handler, build_store, serve_lines};
use nodeload_server::observability::{init_logging, LoggingConfig};
use nodeload_server::NodeloadConfig;

/// nodeload - keyed batch resolver for learning-management nodes
#[derive(Parser, Debug)]
#[command(name = "nodeload")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixture file (JSON or YAML); overrides storage.fixtures_path
    #[arg(short, long)]
    fixtures: Option<PathBuf>,

    /// Newline-delimited JSON requests; stdin when omitted
    #[arg(short, long)]
    requests: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => NodeloadConfig::load(path)?,
        None => NodeloadConfig::from_env()?,
    };

    init_logging(LoggingConfig::from(&config.logging));
    info!(version = env!("CARGO_PKG_VERSION"), "starting nodeload");

    let fixtures = args
        .fixtures
        .or_else(|| config.storage.fixtures_path.as_ref().map(PathBuf::from));
    let store = build_store(fixtures.as_deref()).await?;
    let handler = build_handler(&config, store);

    let answered = match &args.requests {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            serve_lines(&handler, BufReader::new(file), stdout()).await?
        }
        None => serve_lines(&handler, BufReader::new(stdin()), stdout()).await?,
    };

    info!(requests = answered, "done");
    Ok(())
}
