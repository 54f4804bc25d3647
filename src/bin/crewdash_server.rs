//!
//! crewdash server binary
//! ----------------------
//! Command-line entry point for the crewdash HTTP server. Supports configuration
//! via CLI flags and environment variables (flags win).

use anyhow::Result;
use std::env;

use crewdash::config::{has_flag, ServerConfig, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber; RUST_LOG overrides the info default
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let config = ServerConfig::from_env_and_args(&args);
    tracing::info!(
        http = %config.socket_addr(),
        seed = ?config.seed_file,
        session_ttl_secs = config.session_ttl.as_secs(),
        "crewdash starting"
    );
    crewdash::server::run_with_config(config).await
}
