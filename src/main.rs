//! sqlgate binary entry point.
//!
//! Loads `.env`, initializes tracing, resolves the immutable config
//! from the environment, applies CLI overrides, and serves.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqlgate::Config;

#[derive(Parser, Debug)]
#[command(
    name = "sqlgate",
    version,
    about = "HTTP gateway exposing a fixed patient insert and a guarded SQL SELECT passthrough"
)]
struct Cli {
    /// Port to listen on (overrides PORT from the environment)
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging (RUST_LOG still wins when set)
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let mut config = Config::from_env().context("configuration error")?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    sqlgate::serve(config).await.context("server error")?;
    Ok(())
}
