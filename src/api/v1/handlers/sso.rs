/*
 * Responsibility
 * - POST /sso/session: interactive login completion. The deployment has already exchanged the
 *   authorization code; this validates the access token, runs OAuth completion and hands a
 *   new session correlation id to the browser as a cookie (any previous session is retired)
 * - POST /sso/logout: drop the cached account for the presented session, clear the cookie
 */
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};

use crate::api::v1::dto::sso::{SessionRequest, SessionResponse};
use crate::error::AppError;
use crate::services::auth::{
    CompletionHandler, request_scope::RequestContext, session::RequestSession,
};
use crate::state::AppState;

pub async fn complete_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state.auth.principal(body.into()).map_err(|err| {
        tracing::warn!(error = ?err, "login token verification failed");
        AppError::Unauthorized
    })?;

    let dispatcher = state.auth.dispatcher();

    // The session id is always minted here; a presented cookie is never adopted.
    let mut ctx = RequestContext::new(RequestSession::default());
    let completion = dispatcher.complete_oauth(&mut ctx, principal).await?;

    if let Some(previous) = state.session_cookie.presented(&headers) {
        if let Err(err) = dispatcher.retire_session(&previous).await {
            // the old entry still expires with its TTL
            tracing::warn!(error = %err, "failed to invalidate previous session entry");
        }
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        state.session_cookie.header_value(&completion.session_id)?,
    );

    let account = &completion.account;
    let body = SessionResponse {
        subject: account.security_context().subject().to_string(),
        principal: account.principal().name().to_string(),
        roles: account.roles().iter().map(str::to_owned).collect(),
        persisted: completion.persisted,
    };

    Ok((StatusCode::OK, response_headers, Json(body)))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let mut session = RequestSession::new(state.session_cookie.presented(&headers));
    // logout never mints a session
    session.commit();
    let mut ctx = RequestContext::new(session);

    if let Err(err) = state.auth.dispatcher().logout(&mut ctx).await {
        // the cookie is cleared regardless; the stale entry expires with its TTL
        tracing::warn!(error = %err, "failed to invalidate session entry");
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        state.session_cookie.clear_header_value()?,
    );

    Ok((StatusCode::NO_CONTENT, response_headers))
}
