//! Validated token material for one authentication event, and the principal wrapping it.
use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::auth::validator::ValidatedToken;

/// Parsed JWT payload. Kept as raw JSON so role extraction can tell a missing claim
/// from a malformed one.
pub type Claims = Map<String, Value>;

/// Raw tokens handed over by the deployment after a successful exchange (or a bare
/// bearer token for API calls).
#[derive(Clone, Default)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

impl TokenSet {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("refresh_token", &self.refresh_token.is_some())
            .field("id_token", &self.id_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Token material for one validated identity.
///
/// - `subject` always mirrors the `sub` claim and never changes for the lifetime of the context
/// - a context is "refreshable" when the identity provider issued a refresh token alongside it
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityContext {
    subject: String,
    token_string: String,
    claims: Claims,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    id_token_string: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl SecurityContext {
    pub fn new(tokens: TokenSet, validated: ValidatedToken) -> Self {
        Self {
            subject: validated.subject,
            token_string: tokens.access_token,
            claims: validated.claims,
            expires_at: validated.expires_at,
            id_token_string: tokens.id_token,
            refresh_token: tokens.refresh_token,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_refreshable(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print token strings
        f.debug_struct("SecurityContext")
            .field("subject", &self.subject)
            .field("expires_at", &self.expires_at)
            .field("refreshable", &self.is_refreshable())
            .finish_non_exhaustive()
    }
}

/// Authenticated subject. Owns its `SecurityContext` through an `Arc` so the
/// context can be attached to the request scope without copying token material.
#[derive(Debug, Clone)]
pub struct Principal {
    name: String,
    context: Arc<SecurityContext>,
}

impl Principal {
    /// Name the principal after `principal_attribute` (e.g. `preferred_username`),
    /// falling back to `sub` when the claim is missing or empty.
    pub fn new(context: SecurityContext, principal_attribute: &str) -> Self {
        let name = context
            .claim_str(principal_attribute)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(context.subject.as_str())
            .to_string();

        Self {
            name,
            context: Arc::new(context),
        }
    }

    pub(crate) fn from_parts(name: String, context: Arc<SecurityContext>) -> Self {
        Self { name, context }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn security_context(&self) -> &Arc<SecurityContext> {
        &self.context
    }
}
