//! Health endpoint
//!
//! - GET /api/v1/health - Liveness, database reachability and open sockets

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::api::middleware::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.pool.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            "unavailable"
        }
    };
    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database == "ok" { "ok" } else { "degraded" },
            "database": database,
            "connections": state.gateway.connection_count(),
        })),
    )
}
