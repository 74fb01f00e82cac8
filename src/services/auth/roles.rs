//! Claims → role set derivation.
use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::services::auth::security_context::SecurityContext;

/// Authority strings granted to a principal. Ordering carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(",");
        write!(f, "[{}]", joined)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoleDerivationError {
    #[error("malformed role claim '{claim}': {reason}")]
    Malformed { claim: String, reason: &'static str },
}

fn malformed(claim: impl Into<String>, reason: &'static str) -> RoleDerivationError {
    RoleDerivationError::Malformed {
        claim: claim.into(),
        reason,
    }
}

/// Where roles are read from in the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSource {
    /// `realm_access.roles`
    Realm,
    /// `resource_access.<client>.roles`
    Resource(String),
    /// A top-level string array claim, e.g. `roles`
    Claim(String),
}

impl FromStr for RoleSource {
    type Err = ();

    // "realm" | "resource:<client>" | "claim:<name>"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("realm") {
            return Ok(Self::Realm);
        }
        match s.split_once(':') {
            Some(("resource", client)) if !client.trim().is_empty() => {
                Ok(Self::Resource(client.trim().to_string()))
            }
            Some(("claim", name)) if !name.trim().is_empty() => {
                Ok(Self::Claim(name.trim().to_string()))
            }
            _ => Err(()),
        }
    }
}

/// Claims-to-roles derivation. Implementations must be deterministic and side-effect-free:
/// both completion paths call the same extractor and must never disagree.
pub trait RoleExtractor: Send + Sync {
    fn extract(&self, context: &SecurityContext) -> Result<RoleSet, RoleDerivationError>;
}

#[derive(Debug, Clone)]
pub struct ClaimsRoleExtractor {
    source: RoleSource,
}

impl ClaimsRoleExtractor {
    pub fn new(source: RoleSource) -> Self {
        Self { source }
    }
}

impl RoleExtractor for ClaimsRoleExtractor {
    fn extract(&self, context: &SecurityContext) -> Result<RoleSet, RoleDerivationError> {
        let claims = context.claims();

        match &self.source {
            RoleSource::Realm => roles_in_container(claims.get("realm_access"), "realm_access"),
            RoleSource::Resource(client) => match claims.get("resource_access") {
                None | Some(Value::Null) => Ok(RoleSet::default()),
                Some(Value::Object(access)) => roles_in_container(
                    access.get(client),
                    &format!("resource_access.{}", client),
                ),
                Some(_) => Err(malformed("resource_access", "expected an object")),
            },
            RoleSource::Claim(name) => role_array(claims.get(name), name),
        }
    }
}

// A missing container means "no roles granted"; a container of the wrong shape is an error.
fn roles_in_container(value: Option<&Value>, claim: &str) -> Result<RoleSet, RoleDerivationError> {
    match value {
        None | Some(Value::Null) => Ok(RoleSet::default()),
        Some(Value::Object(container)) => {
            role_array(container.get("roles"), &format!("{}.roles", claim))
        }
        Some(_) => Err(malformed(claim, "expected an object")),
    }
}

fn role_array(value: Option<&Value>, claim: &str) -> Result<RoleSet, RoleDerivationError> {
    match value {
        None | Some(Value::Null) => Ok(RoleSet::default()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| malformed(claim, "expected an array of strings"))
            })
            .collect(),
        Some(_) => Err(malformed(claim, "expected an array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::security_context::tests::context_from;
    use serde_json::json;

    fn realm() -> ClaimsRoleExtractor {
        ClaimsRoleExtractor::new(RoleSource::Realm)
    }

    #[test]
    fn realm_roles_are_extracted() {
        let ctx = context_from(
            json!({"sub": "a", "realm_access": {"roles": ["user", "admin", "user"]}}),
            None,
        );
        let roles = realm().extract(&ctx).unwrap();
        assert_eq!(roles, RoleSet::from_iter(["admin", "user"]));
    }

    #[test]
    fn resource_roles_are_scoped_to_client() {
        let ctx = context_from(
            json!({
                "sub": "a",
                "realm_access": {"roles": ["realm-role"]},
                "resource_access": {
                    "gateway": {"roles": ["reader"]},
                    "other": {"roles": ["writer"]}
                }
            }),
            None,
        );
        let roles = ClaimsRoleExtractor::new(RoleSource::Resource("gateway".into()))
            .extract(&ctx)
            .unwrap();
        assert_eq!(roles, RoleSet::from_iter(["reader"]));
    }

    #[test]
    fn top_level_claim_roles() {
        let ctx = context_from(json!({"sub": "a", "roles": ["api-client"]}), None);
        let roles = ClaimsRoleExtractor::new(RoleSource::Claim("roles".into()))
            .extract(&ctx)
            .unwrap();
        assert!(roles.contains("api-client"));
        assert_eq!(roles.len(), 1);
    }

    #[test]
    fn missing_claims_yield_empty_set() {
        let ctx = context_from(json!({"sub": "a"}), None);
        assert!(realm().extract(&ctx).unwrap().is_empty());

        let ctx = context_from(json!({"sub": "a", "realm_access": {}}), None);
        assert!(realm().extract(&ctx).unwrap().is_empty());

        let ctx = context_from(json!({"sub": "a", "resource_access": {}}), None);
        let roles = ClaimsRoleExtractor::new(RoleSource::Resource("gateway".into()))
            .extract(&ctx)
            .unwrap();
        assert!(roles.is_empty());
    }

    #[test]
    fn malformed_claims_are_rejected() {
        let cases = [
            json!({"sub": "a", "realm_access": "admin"}),
            json!({"sub": "a", "realm_access": {"roles": "admin"}}),
            json!({"sub": "a", "realm_access": {"roles": ["admin", 7]}}),
        ];
        for claims in cases {
            let ctx = context_from(claims, None);
            assert!(matches!(
                realm().extract(&ctx),
                Err(RoleDerivationError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn malformed_error_names_the_claim() {
        let ctx = context_from(json!({"sub": "a", "realm_access": {"roles": [true]}}), None);
        let err = realm().extract(&ctx).unwrap_err();
        assert_eq!(
            err,
            RoleDerivationError::Malformed {
                claim: "realm_access.roles".into(),
                reason: "expected an array of strings",
            }
        );
    }

    #[test]
    fn role_source_parses() {
        assert_eq!("realm".parse::<RoleSource>(), Ok(RoleSource::Realm));
        assert_eq!(
            "resource:gateway".parse::<RoleSource>(),
            Ok(RoleSource::Resource("gateway".into()))
        );
        assert_eq!(
            "claim:roles".parse::<RoleSource>(),
            Ok(RoleSource::Claim("roles".into()))
        );
        assert!("resource:".parse::<RoleSource>().is_err());
        assert!("groups".parse::<RoleSource>().is_err());
    }
}
