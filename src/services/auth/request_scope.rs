//! Request-scoped authentication state, passed by `&mut` through the completion call chain.
//!
//! - the security-context slot: read by downstream authorization (in axum, carried on as `AuthCtx`)
//! - the current-authentication slot: populated on the bearer path and on cached-session reuse
//! - the request's session scope
use std::sync::Arc;

use crate::services::auth::{
    account::AuthenticationToken,
    security_context::SecurityContext,
    session::SessionScope,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Unauthenticated,
    OAuthCompleting,
    BearerCompleting,
    ContextAttached,
}

pub struct RequestContext {
    state: CompletionState,
    security_context: Option<Arc<SecurityContext>>,
    authentication: Option<AuthenticationToken>,
    session: Box<dyn SessionScope>,
}

impl RequestContext {
    pub fn new(session: impl SessionScope + 'static) -> Self {
        Self {
            state: CompletionState::Unauthenticated,
            security_context: None,
            authentication: None,
            session: Box::new(session),
        }
    }

    pub fn state(&self) -> CompletionState {
        self.state
    }

    pub(crate) fn begin(&mut self, state: CompletionState) {
        self.state = state;
    }

    // Completion failed before anything was attached.
    pub(crate) fn abandon(&mut self) {
        self.state = CompletionState::Unauthenticated;
    }

    /// Attach (or replace) the security context. Exactly one is attached at a time.
    pub fn attach_security_context(&mut self, context: Arc<SecurityContext>) {
        self.security_context = Some(context);
        self.state = CompletionState::ContextAttached;
    }

    pub fn security_context(&self) -> Option<&Arc<SecurityContext>> {
        self.security_context.as_ref()
    }

    pub fn set_authentication(&mut self, token: AuthenticationToken) {
        self.authentication = Some(token);
    }

    pub fn authentication(&self) -> Option<&AuthenticationToken> {
        self.authentication.as_ref()
    }

    pub fn session_mut(&mut self) -> &mut dyn SessionScope {
        self.session.as_mut()
    }

    /// Hand the attached state over to the framework layer.
    pub fn into_attached(self) -> Option<(Arc<SecurityContext>, AuthenticationToken)> {
        match (self.state, self.security_context, self.authentication) {
            (CompletionState::ContextAttached, Some(ctx), Some(auth)) => Some((ctx, auth)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("state", &self.state)
            .field("security_context", &self.security_context)
            .field("authentication", &self.authentication.is_some())
            .finish_non_exhaustive()
    }
}
