use serde::{Deserialize, Serialize};

use crate::services::auth::security_context::TokenSet;

/// Token set produced by the deployment's authorization-code exchange.
#[derive(Deserialize)]
pub struct SessionRequest {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl From<SessionRequest> for TokenSet {
    fn from(req: SessionRequest) -> Self {
        TokenSet {
            access_token: req.access_token,
            refresh_token: req.refresh_token,
            id_token: req.id_token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub subject: String,
    pub principal: String,
    pub roles: Vec<String>,
    // false: login succeeded but the session will not be reused on the next request
    pub persisted: bool,
}
