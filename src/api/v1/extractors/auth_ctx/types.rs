/*
 * Responsibility
 * - The authenticated context as handlers see it
 * - The middleware completes authentication and stores this in request extensions;
 *   handlers only ever receive this type
 *
 * Notes
 * - The extension's type is the well-known key shared with downstream readers
 * - Exactly one is inserted per request, whichever completion path ran
 */
use std::sync::Arc;

use crate::services::auth::{account::AuthenticationToken, security_context::SecurityContext};

#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub security_context: Arc<SecurityContext>,
    pub authentication: AuthenticationToken,
}

impl AuthCtx {
    pub fn new(security_context: Arc<SecurityContext>, authentication: AuthenticationToken) -> Self {
        Self {
            security_context,
            authentication,
        }
    }
}
