use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::v1::extractors::AuthCtx;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: String,
    pub principal: String,
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub refreshable: bool,
}

impl From<&AuthCtx> for MeResponse {
    fn from(ctx: &AuthCtx) -> Self {
        Self {
            subject: ctx.security_context.subject().to_string(),
            principal: ctx.authentication.name().to_string(),
            roles: ctx.authentication.roles().iter().map(str::to_owned).collect(),
            expires_at: ctx.security_context.expires_at(),
            refreshable: ctx.security_context.is_refreshable(),
        }
    }
}
