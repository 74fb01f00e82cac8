/*
 * Responsibility
 * - GET /me: who the attached context says the caller is
 * - Works the same for bearer calls and cached browser sessions
 */
use axum::Json;

use crate::api::v1::{dto::me::MeResponse, extractors::AuthCtxExtractor};

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<MeResponse> {
    Json(MeResponse::from(&ctx))
}
