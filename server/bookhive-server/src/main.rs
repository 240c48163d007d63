use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use sqlx::migrate::Migrator;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bookhive_server::config::AppConfig;
use bookhive_server::{create_app, keepalive, BookhiveServer};

static MIGRATOR: Migrator = sqlx::migrate!();

/// Bookhive HTTP Server
#[derive(Parser, Debug)]
#[command(name = "bookhive-server")]
#[command(about = "Book catalog and favorites platform HTTP API server")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("Starting Bookhive HTTP server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env().context("configuration error")?;
    let server = BookhiveServer::new(config).await?;

    server.db_pool.run_migrations(&MIGRATOR).await?;

    if let Some(keepalive_config) = server.config.keepalive.clone() {
        info!(url = %keepalive_config.base_url, "starting keepalive pinger");
        keepalive::spawn_keepalive(server.http.clone(), keepalive_config);
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    let app = create_app(server);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "bookhive_server=debug,database_layer=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
