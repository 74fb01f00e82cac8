/*
 * Responsibility
 * - GET /health (liveness; outside the auth middleware)
 * - Reports which token store backend completions persist to
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.auth.dispatcher().store_backend();
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "token_store": backend})),
    )
}
