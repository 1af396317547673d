mod config;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use foodbridge_api::auth::{AppState, AppStateInner};
use foodbridge_db::Database;

use crate::config::Config;

const USAGE: &str = "usage: foodbridge [serve | migrate]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodbridge=debug,foodbridge_api=debug,foodbridge_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    match std::env::args().nth(1).as_deref() {
        None | Some("serve") => serve(config).await,
        Some("migrate") => migrate(&config),
        Some(other) => {
            eprintln!("unknown command '{}'\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

fn migrate(config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.db_path)?;
    let version = db.migrate()?;
    info!("Schema at version {} ({})", version, config.db_path.display());
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if config.has_placeholder_secret() {
        warn!("FOODBRIDGE_SESSION_SECRET is unset or a placeholder; sessions can be forged");
    }

    let db = Database::open(&config.db_path)?;
    db.ensure_current()?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        session_secret: config.session_secret,
        session_ttl: config.session_ttl,
    });

    let app = foodbridge_api::router(state, &config.static_dir).layer(TraceLayer::new_for_http());

    info!("FoodBridge listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
