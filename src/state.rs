/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 *   - auth: token validation + completion dispatcher
 *   - session_cookie: how the session correlation id travels to the browser
 * - Cheap to Clone (Arc inside)
 */
use std::sync::Arc;

use crate::middleware::session_cookie::SessionCookie;
use crate::services::auth::AuthService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub session_cookie: Arc<SessionCookie>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, session_cookie: SessionCookie) -> Self {
        Self {
            auth,
            session_cookie: Arc::new(session_cookie),
        }
    }
}
