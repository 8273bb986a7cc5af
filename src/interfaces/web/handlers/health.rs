use axum::{Json, extract::State};

use super::super::AppState;
use crate::core::records::{ConnectionStatus, HealthResponse};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Store probe. Always 200; failures are reported in the body.
pub async fn db_test(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(state.service.check_connection().await)
}
