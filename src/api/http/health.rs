// src/api/http/health.rs
// Health check and readiness endpoints for load balancers and orchestrators
// (SPEC_FULL ambient stack, modeled on the teacher's probe trio).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    db: &'static str,
    vector_index: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    migrations: &'static str,
}

/// GET /health — 200 if the database and vector index both answer, 503
/// otherwise. Meant for load balancer health checks.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = sqlx::query("SELECT 1").fetch_one(state.catalog.pool()).await.is_ok();
    let vector_ok = state.vector_index.health_check().await;

    let response = HealthResponse {
        status: if db_ok && vector_ok { "healthy" } else { "unhealthy" },
        db: if db_ok { "ok" } else { "error" },
        vector_index: if vector_ok { "ok" } else { "error" },
    };

    if db_ok && vector_ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// GET /ready — 200 once migrations have been applied, so orchestrators
/// don't route webhook traffic to a pod still booting.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let migrations_ok = sqlx::query("SELECT 1 FROM products LIMIT 1")
        .fetch_optional(state.catalog.pool())
        .await
        .is_ok();

    let response = ReadyResponse {
        status: if migrations_ok { "ready" } else { "not_ready" },
        migrations: if migrations_ok { "applied" } else { "pending" },
    };

    if migrations_ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// GET /live — plain liveness ping, no dependency checks.
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "alive"})))
}
