//! Protected-route authentication → AuthCtx in request extensions.
//!
//! - `Authorization: Bearer <jwt>`: validate, then bearer completion (stateless; the session
//!   cookie is neither read for authentication nor created)
//! - otherwise: reuse the account cached for the presented session cookie
//! - neither: 401

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{
    CompletionHandler,
    request_scope::RequestContext,
    security_context::TokenSet,
    session::RequestSession,
};
use crate::state::AppState;

/// Apply the access middleware to the given router.
///
/// ```ignore
/// let protected = Router::new().route("/me", get(me));
/// let protected = middleware::auth::access::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8's from_fn cannot take a State extractor; pass state explicitly
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let dispatcher = state.auth.dispatcher();

    let ctx = match bearer_token(req.headers()) {
        Some(token) => {
            let principal = match state.auth.principal(TokenSet::bearer(token)) {
                Ok(principal) => principal,
                Err(err) => {
                    tracing::warn!(error = ?err, "access token verification failed");
                    return Err(AppError::Unauthorized);
                }
            };

            // Bearer calls are session-agnostic: no cookie is consulted.
            let mut ctx = RequestContext::new(RequestSession::default());
            dispatcher.complete_bearer(&mut ctx, principal)?;
            ctx
        }
        None => {
            let presented = state.session_cookie.presented(req.headers());
            let mut ctx = RequestContext::new(RequestSession::new(presented));
            let restored = dispatcher.restore_cached(&mut ctx).await;
            match restored {
                Ok(Some(_)) => ctx,
                Ok(None) => return Err(AppError::Unauthorized),
                Err(err) => {
                    tracing::warn!(error = %err, "cached session lookup failed");
                    return Err(AppError::Unauthorized);
                }
            }
        }
    };

    let (security_context, authentication) = ctx.into_attached().ok_or(AppError::Unauthorized)?;

    // middleware → extractor
    req.extensions_mut()
        .insert(AuthCtx::new(security_context, authentication));

    Ok(next.run(req).await)
}
