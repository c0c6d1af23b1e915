use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use leadkit_server::app::build_app;
use leadkit_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("leadkit=info".parse()?),
        )
        .json()
        .init();

    let cfg = leadkit_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/leadkit.db", cfg.data_dir);

    // Open DuckDB — initialises schema and seeds the settings table
    // (including the JWT signing secret).
    let db = leadkit_duckdb::LeadStore::open(&db_path, &cfg.duckdb_memory_limit)?;

    match &cfg.auth_mode {
        leadkit_core::config::AuthMode::Local => {
            info!("Auth enabled — session JWTs signed with the stored secret");
        }
        leadkit_core::config::AuthMode::None => {
            info!("Auth disabled (LEADKIT_AUTH=none) — identity from request headers");
        }
    }

    let state = Arc::new(AppState::new(db, cfg.clone()));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = build_app(Arc::clone(&state));

    info!(port = cfg.port, "leadkit listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
