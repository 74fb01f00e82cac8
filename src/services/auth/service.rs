use std::sync::Arc;

use crate::services::auth::{
    completion::CompletionDispatcher,
    security_context::{Principal, SecurityContext, TokenSet},
    validator::{TokenValidator, ValidationError},
};

/// Process-level auth service held in `AppState`.
///
/// Turns raw tokens into a `Principal` (through the configured validator) and exposes the
/// completion dispatcher the HTTP adapters drive.
#[derive(Clone)]
pub struct AuthService {
    validator: Arc<dyn TokenValidator>,
    dispatcher: CompletionDispatcher,
    principal_attribute: String,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("dispatcher", &self.dispatcher)
            .field("principal_attribute", &self.principal_attribute)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        validator: Arc<dyn TokenValidator>,
        dispatcher: CompletionDispatcher,
        principal_attribute: impl Into<String>,
    ) -> Self {
        Self {
            validator,
            dispatcher,
            principal_attribute: principal_attribute.into(),
        }
    }

    /// Validate the access token and wrap the result in a principal.
    pub fn principal(&self, tokens: TokenSet) -> Result<Principal, ValidationError> {
        let validated = self.validator.validate(&tokens.access_token)?;
        let context = SecurityContext::new(tokens, validated);
        Ok(Principal::new(context, &self.principal_attribute))
    }

    pub fn dispatcher(&self) -> &CompletionDispatcher {
        &self.dispatcher
    }
}
