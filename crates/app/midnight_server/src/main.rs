//! After Midnight API server binary.
//!
//! Serves the REST API over PostgreSQL when a database URL is configured,
//! otherwise over an in-memory store that is lost on exit.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use midnight_api::config::ApiConfig;
use midnight_core::store::{MemoryStore, PgStore, SharedStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "info,midnight_api=debug,midnight_core=debug";

/// CLI arguments. Anything left unset falls back to the environment
/// (see [`ApiConfig::from_env`]).
#[derive(Parser, Debug)]
#[command(name = "midnight_server", about = "After Midnight API server")]
struct Args {
    /// Address to listen on, e.g. `0.0.0.0:8080`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL. Without one the server runs in memory.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Requests allowed per client per window.
    #[arg(long)]
    rate_limit_max_requests: Option<u32>,

    /// Rate-limit window length in seconds.
    #[arg(long)]
    rate_limit_window_secs: Option<u64>,
}

impl Args {
    /// Apply command-line overrides on top of the environment configuration.
    fn apply(self, config: &mut ApiConfig) {
        if let Some(bind_addr) = self.bind_addr {
            config.bind_addr = bind_addr;
        }
        if let Some(url) = self.database_url {
            config.database_url = Some(url);
        }
        if let Some(max) = self.rate_limit_max_requests {
            config.rate_limit.max_requests = max;
        }
        if let Some(secs) = self.rate_limit_window_secs {
            config.rate_limit.window = Duration::from_secs(secs);
        }
        config.rate_limit = config.rate_limit.normalized();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    let max_connections = args.max_connections;
    let mut config = ApiConfig::from_env();
    args.apply(&mut config);

    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        "starting midnight_server"
    );

    let store: SharedStore = match &config.database_url {
        Some(url) => {
            info!(max_connections, "connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(url)
                .await?;

            info!("running database migrations");
            midnight_core::migrate::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let state = midnight_api::AppState::new(store, config.clone());
    let sweeper = state.rate_limiter.spawn_eviction_task();
    let app = midnight_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
