/*
 * Responsibility
 * - CompletionHandler: the capability a framework adapter calls once a token is judged valid
 * - CompletionDispatcher: OAuth completion (persisted, session-bound) vs bearer completion
 *   (stateless), plus cached-session reuse and logout on top of the token store
 *
 * Failure policy
 * - anything before the security context is attached aborts the completion (fail-closed)
 * - token store failures after attachment are logged; the current request stays authenticated
 */
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::services::auth::{
    account::{Account, AuthenticationToken, bind_account},
    request_scope::{CompletionState, RequestContext},
    roles::{RoleDerivationError, RoleExtractor},
    security_context::Principal,
    session::{self, SessionError, SessionId},
    token_store::{TokenStore, TokenStoreError},
};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("role derivation failed: {0}")]
    RoleDerivation(#[from] RoleDerivationError),

    #[error("session creation failed: {0}")]
    SessionCreation(#[from] SessionError),

    #[error("token store failure: {0}")]
    TokenStore(#[from] TokenStoreError),
}

/// Result of a successful OAuth completion.
#[derive(Debug)]
pub struct OAuthCompletion {
    pub account: Account,
    pub session_id: SessionId,
    // false when the store write failed; the next request will not find a cached account
    pub persisted: bool,
}

#[async_trait]
pub trait CompletionHandler: Send + Sync {
    /// Interactive login completion. Creates a session if needed and persists the account.
    async fn complete_oauth(
        &self,
        ctx: &mut RequestContext,
        principal: Principal,
    ) -> Result<OAuthCompletion, CompletionError>;

    /// Stateless API completion. Never touches the token store or the session.
    fn complete_bearer(
        &self,
        ctx: &mut RequestContext,
        principal: Principal,
    ) -> Result<AuthenticationToken, CompletionError>;

    fn session_correlation_id(
        &self,
        ctx: &mut RequestContext,
        create: bool,
    ) -> Result<Option<SessionId>, SessionError>;
}

#[derive(Clone)]
pub struct CompletionDispatcher {
    roles: Arc<dyn RoleExtractor>,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for CompletionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionDispatcher")
            .field("store", &self.store.backend_name())
            .finish_non_exhaustive()
    }
}

impl CompletionDispatcher {
    pub fn new(roles: Arc<dyn RoleExtractor>, store: Arc<dyn TokenStore>) -> Self {
        Self { roles, store }
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    // Shared by both paths so the derived roles can never diverge.
    fn derive_account(&self, principal: Principal) -> Result<Account, CompletionError> {
        let context = Arc::clone(principal.security_context());
        let roles = self.roles.extract(&context)?;
        Ok(bind_account(principal, roles, context))
    }

    /// Reattach an account saved by an earlier OAuth completion in the same session.
    ///
    /// - no session → `Ok(None)` (no session is created)
    /// - expired account → entry is invalidated, `Ok(None)`
    pub async fn restore_cached(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Option<AuthenticationToken>, CompletionError> {
        let Some(session_id) = session::resolve(ctx.session_mut(), false)? else {
            return Ok(None);
        };
        let Some(account) = self.store.lookup(&session_id).await? else {
            tracing::debug!("no cached account for session");
            return Ok(None);
        };

        if !account.is_active(Utc::now()) {
            tracing::warn!(
                principal = %account.principal().name(),
                refreshable = account.security_context().is_refreshable(),
                "cached account expired; invalidating session entry"
            );
            self.store.invalidate(&session_id).await?;
            return Ok(None);
        }

        let token = AuthenticationToken::new(account);
        ctx.set_authentication(token.clone());
        ctx.attach_security_context(Arc::clone(token.account().security_context()));
        Ok(Some(token))
    }

    /// Drop the cached account for the current session, if any.
    pub async fn logout(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Option<SessionId>, CompletionError> {
        let Some(session_id) = session::resolve(ctx.session_mut(), false)? else {
            return Ok(None);
        };
        let removed = self.store.invalidate(&session_id).await?;
        tracing::info!(removed, "session logged out");
        Ok(Some(session_id))
    }

    /// Drop the account cached under a session id the client is moving away from
    /// (id rotation on login). Returns whether an entry was removed.
    pub async fn retire_session(&self, session_id: &SessionId) -> Result<bool, CompletionError> {
        let removed = self.store.invalidate(session_id).await?;
        if removed {
            tracing::debug!("previous session entry retired");
        }
        Ok(removed)
    }
}

#[async_trait]
impl CompletionHandler for CompletionDispatcher {
    async fn complete_oauth(
        &self,
        ctx: &mut RequestContext,
        principal: Principal,
    ) -> Result<OAuthCompletion, CompletionError> {
        ctx.begin(CompletionState::OAuthCompleting);

        let account = match self.derive_account(principal) {
            Ok(account) => account,
            Err(err) => {
                tracing::warn!(error = %err, "oauth completion aborted");
                ctx.abandon();
                return Err(err);
            }
        };

        // Resolve (or create) the session before attaching anything: a session that
        // cannot be created is fatal, and must not leave a half-completed request behind.
        let session_id = match session::resolve_or_create(ctx.session_mut()) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, "oauth completion aborted");
                ctx.abandon();
                return Err(err.into());
            }
        };

        ctx.attach_security_context(Arc::clone(account.security_context()));
        tracing::debug!(
            principal = %account.principal().name(),
            roles = %account.roles(),
            "oauth completion: context attached"
        );

        let persisted = match self.store.save(&session_id, &account).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    backend = self.store.backend_name(),
                    "failed to persist account; session will not be reused"
                );
                false
            }
        };

        Ok(OAuthCompletion {
            account,
            session_id,
            persisted,
        })
    }

    fn complete_bearer(
        &self,
        ctx: &mut RequestContext,
        principal: Principal,
    ) -> Result<AuthenticationToken, CompletionError> {
        ctx.begin(CompletionState::BearerCompleting);

        let account = match self.derive_account(principal) {
            Ok(account) => account,
            Err(err) => {
                tracing::warn!(error = %err, "bearer completion aborted");
                ctx.abandon();
                return Err(err);
            }
        };

        tracing::debug!(
            principal = %account.principal().name(),
            roles = %account.roles(),
            "bearer completion"
        );

        let token = AuthenticationToken::new(account);
        ctx.set_authentication(token.clone());
        ctx.attach_security_context(Arc::clone(token.account().security_context()));
        Ok(token)
    }

    fn session_correlation_id(
        &self,
        ctx: &mut RequestContext,
        create: bool,
    ) -> Result<Option<SessionId>, SessionError> {
        session::resolve(ctx.session_mut(), create)
    }
}
