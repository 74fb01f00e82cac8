//! Account binding: the durable {principal, roles, context} bundle handed to the token store.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::auth::{
    roles::RoleSet,
    security_context::{Principal, SecurityContext},
};

#[derive(Debug, Clone)]
pub struct Account {
    principal: Principal,
    roles: RoleSet,
    context: Arc<SecurityContext>,
}

/// Bind an account. Pure and total: role validation happens before this is called.
pub fn bind_account(principal: Principal, roles: RoleSet, context: Arc<SecurityContext>) -> Account {
    Account {
        principal,
        roles,
        context,
    }
}

impl Account {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn security_context(&self) -> &Arc<SecurityContext> {
        &self.context
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.context.is_active(now)
    }
}

/// Serialized form used by remote token store backends.
///
/// The principal keeps only its name; its context is the account's context.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredAccount {
    principal: String,
    roles: RoleSet,
    context: SecurityContext,
}

impl From<&Account> for StoredAccount {
    fn from(account: &Account) -> Self {
        Self {
            principal: account.principal.name().to_string(),
            roles: account.roles.clone(),
            context: account.context.as_ref().clone(),
        }
    }
}

impl From<StoredAccount> for Account {
    fn from(stored: StoredAccount) -> Self {
        let context = Arc::new(stored.context);
        let principal = Principal::from_parts(stored.principal, Arc::clone(&context));
        bind_account(principal, stored.roles, context)
    }
}

/// Authentication placed in the current-authentication slot; what in-process
/// authorization checks consult.
#[derive(Debug, Clone)]
pub struct AuthenticationToken {
    account: Account,
}

impl AuthenticationToken {
    pub fn new(account: Account) -> Self {
        Self { account }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn name(&self) -> &str {
        self.account.principal().name()
    }

    pub fn roles(&self) -> &RoleSet {
        self.account.roles()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.account.roles().contains(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::security_context::tests::context_from;
    use serde_json::json;

    fn account() -> Account {
        let principal = Principal::new(
            context_from(json!({"sub": "u-1", "preferred_username": "alice"}), Some("rt")),
            "preferred_username",
        );
        let context = Arc::clone(principal.security_context());
        bind_account(principal, RoleSet::from_iter(["user"]), context)
    }

    #[test]
    fn binding_shares_the_principal_context() {
        let account = account();
        assert!(Arc::ptr_eq(
            account.security_context(),
            account.principal().security_context()
        ));
    }

    #[test]
    fn stored_account_restores_principal_and_roles() {
        let original = account();
        let json = serde_json::to_string(&StoredAccount::from(&original)).unwrap();
        let restored = Account::from(serde_json::from_str::<StoredAccount>(&json).unwrap());

        assert_eq!(restored.principal().name(), "alice");
        assert_eq!(restored.roles(), original.roles());
        assert_eq!(restored.security_context().subject(), "u-1");
        assert_eq!(restored.security_context().refresh_token(), Some("rt"));
        assert!(Arc::ptr_eq(
            restored.security_context(),
            restored.principal().security_context()
        ));
    }

    #[test]
    fn authentication_token_checks_roles() {
        let token = AuthenticationToken::new(account());
        assert_eq!(token.name(), "alice");
        assert!(token.has_role("user"));
        assert!(!token.has_role("admin"));
    }
}
