use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;

use membership_server::{create_app, MembershipServer};
use membership_service::MembershipConfig;

/// Membership Engine HTTP Server
#[derive(Parser, Debug)]
#[command(name = "membership-server")]
#[command(about = "Scheme administration and benefit processing HTTP API server")]
struct Args {
    /// Server bind address
    #[arg(long, env = "MEMBERSHIP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, env = "MEMBERSHIP_PORT", default_value = "8080")]
    port: u16,

    /// Configuration file path (yaml, toml or json)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = MembershipConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.verbose {
        config.logging.log_level = "debug".to_string();
    }
    logger_redacted::init_tracing(&config.logging).context("Failed to initialise logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Membership Engine HTTP Server");

    let server = MembershipServer::from_config(&config)
        .await
        .context("Failed to initialise membership service")?;
    let app = create_app(server);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Membership server running on http://{addr}");
    info!("Health check available at: http://{addr}/health");
    info!("API available at: http://{addr}/api/v1/membership");

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}
