//! Forum gateway binary.
//!
//! Wires the configuration, session store, OAuth client and placeholder
//! route tables into the stage pipeline and serves it.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forum_gateway::config::loader::load_config;
use forum_gateway::http::GatewayServer;
use forum_gateway::routes;
use forum_gateway::{AppConfig, PipelineBuilder};

#[derive(Parser)]
#[command(name = "forum-gateway")]
#[command(about = "Request pipeline gateway for the forum", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when the file
    /// does not exist.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    tracing::info!(
        port = config.port,
        debug = config.debug,
        host = %config.host,
        mini_assets = config.mini_assets,
        "Configuration loaded"
    );

    let port = config.port;
    let pipeline = PipelineBuilder::new(Arc::new(config))
        .with_web_router(routes::web_router())
        .with_api_router(routes::api_router())
        .build()
        .await?;

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    GatewayServer::new(pipeline).run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
