use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::handlers::AppState;

pub async fn liveness() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match state.repository.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            "unhealthy"
        }
    };

    let (status, overall) = if database == "healthy" {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(json!({
            "status": overall,
            "checks": {
                "database": database,
                "ai_provider": state.generator.provider_name()
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}
