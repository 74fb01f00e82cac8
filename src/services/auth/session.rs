/*
 * Responsibility
 * - Session correlation id: the key the token store uses for an OAuth session
 * - SessionScope: a request's view of its session (may create one, never implicitly)
 * - resolve(): the correlator used by both completion paths
 */
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session cannot be created once the response is committed")]
    ResponseCommitted,
    #[error("session scope returned no id for a create request")]
    Unavailable,
}

pub trait SessionScope: Send {
    /// - `create = true`: existing id, or a freshly created one
    /// - `create = false`: existing id or `None`; must never create a session
    fn get_or_create(&mut self, create: bool) -> Result<Option<SessionId>, SessionError>;
}

/// Session state for one request: the id the client presented (cookie) and any id
/// created while this request was handled.
#[derive(Debug, Default)]
pub struct RequestSession {
    presented: Option<SessionId>,
    created: Option<SessionId>,
    committed: bool,
}

impl RequestSession {
    pub fn new(presented: Option<SessionId>) -> Self {
        Self {
            presented,
            ..Self::default()
        }
    }

    /// Mark the response as committed; later create requests fail.
    pub fn commit(&mut self) {
        self.committed = true;
    }
}

impl SessionScope for RequestSession {
    fn get_or_create(&mut self, create: bool) -> Result<Option<SessionId>, SessionError> {
        if let Some(id) = self.created.as_ref().or(self.presented.as_ref()) {
            return Ok(Some(id.clone()));
        }
        if !create {
            return Ok(None);
        }
        if self.committed {
            return Err(SessionError::ResponseCommitted);
        }

        let id = SessionId::generate();
        tracing::debug!(session_id = %id, "session created");
        self.created = Some(id.clone());
        Ok(Some(id))
    }
}

/// Resolve the session correlation id for the current request.
pub fn resolve(
    scope: &mut dyn SessionScope,
    create: bool,
) -> Result<Option<SessionId>, SessionError> {
    scope.get_or_create(create)
}

/// Resolve, creating a session when none exists. Never yields an absent id.
pub fn resolve_or_create(scope: &mut dyn SessionScope) -> Result<SessionId, SessionError> {
    resolve(scope, true)?.ok_or(SessionError::Unavailable)
}
