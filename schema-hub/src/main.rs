use anyhow::Context;
use axum::serve;
use clap::Parser;
use schema_hub::config::{load_config, Cli};
use schema_hub::server;
use schema_hub_core::{DocumentStore, OpenOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config()?.with_cli(cli);

    let options = OpenOptions {
        corrupt_registry: config.corrupt_registry,
    };
    let store = DocumentStore::open_with(&config.data_dir, options)
        .with_context(|| format!("opening schema store in {}", config.data_dir.display()))?;
    let app = server::app(Arc::new(store), &config.cors_origins);

    let addr: SocketAddr = config
        .addr
        .parse()
        .with_context(|| format!("invalid listen address {}", config.addr))?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    serve(listener, app).await?;
    Ok(())
}
