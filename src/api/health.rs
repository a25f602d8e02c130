use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Serialize;

use crate::app_state::AppState;
use crate::utils::api_response::ApiResponse;
use crate::utils::error::AppError;

#[derive(Serialize, Debug)]
pub struct DatabaseStatus {
    pub database: &'static str,
}

/// Defines health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/test-db", get(readiness_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
}

async fn root() -> &'static str {
    "API WORKING"
}

/// **Liveness Check**: the API is running, the database is not consulted.
async fn liveness_check() -> ApiResponse {
    ApiResponse::ack("API is live")
}

/// **Readiness Check**: `500` when the database cannot answer `SELECT 1`.
async fn readiness_check(
    State(state): State<AppState>,
) -> Result<ApiResponse<DatabaseStatus>, AppError> {
    sqlx::query("SELECT 1")
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| AppError::dependency("Database unavailable", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "API is ready",
        DatabaseStatus {
            database: "connected",
        },
    ))
}
