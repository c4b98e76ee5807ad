//! ollama-agent binary entry point.

use clap::Parser;
use ollama_agent::cli::{self, errors::format_error_help, Cli};
use ollama_agent::config::AppConfig;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "OLLAMA_AGENT_LOG";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let result = match AppConfig::load() {
        Ok(config) => cli::run(cli, config).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", format_error_help(&err));
        std::process::exit(1);
    }
}
