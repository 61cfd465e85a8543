// src/main.rs
// Boots the HTTP surface: webhook endpoint plus the health/ready/live probe
// trio, backed by the shared AppState (spec 6).

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use storefront_concierge::api::http::{create_webhook_router, health_check, liveness_check, readiness_check};
use storefront_concierge::config::CONFIG;
use storefront_concierge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = match CONFIG.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting storefront concierge backend");

    let state = match AppState::new().await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(error = %e, "failed to initialize application state");
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .merge(create_webhook_router())
        .route("/health", axum::routing::get(health_check))
        .route("/ready", axum::routing::get(readiness_check))
        .route("/live", axum::routing::get(liveness_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = CONFIG.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind_addr = %bind_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
