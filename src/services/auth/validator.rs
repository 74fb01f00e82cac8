//! Access-token validation seam.
//!
//! Signature/expiry checking belongs to the deployment; the completion protocol consumes
//! only `ValidatedToken`. `JwtTokenValidator` is the stock adapter for locally verifiable JWTs.
use std::str::FromStr;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use thiserror::Error;

use crate::services::auth::security_context::Claims;

/// Output of a successful validation.
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
    pub claims: Claims,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("empty '{0}' claim")]
    EmptyClaim(&'static str),
    #[error("invalid 'exp' claim")]
    InvalidExpiry,
    #[error("invalid verification key: {0}")]
    InvalidKey(String),
}

pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<ValidatedToken, ValidationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    EdDsa,
    Rs256,
}

impl FromStr for JwtAlgorithm {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EDDSA" => Ok(Self::EdDsa),
            "RS256" => Ok(Self::Rs256),
            _ => Err(()),
        }
    }
}

/// JWT access-token verifier.
///
/// `jsonwebtoken::Validation` checks signature, `exp` (with leeway), `iss` and `aud`.
/// On top of that `sub` must be present and non-empty.
#[derive(Clone)]
pub struct JwtTokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtTokenValidator")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtTokenValidator {
    pub fn new(
        public_key_pem: &str,
        algorithm: JwtAlgorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, ValidationError> {
        let (decoding_key, algorithm) = match algorithm {
            JwtAlgorithm::EdDsa => (
                DecodingKey::from_ed_pem(public_key_pem.as_bytes()),
                Algorithm::EdDSA,
            ),
            JwtAlgorithm::Rs256 => (
                DecodingKey::from_rsa_pem(public_key_pem.as_bytes()),
                Algorithm::RS256,
            ),
        };
        let decoding_key = decoding_key.map_err(|e| ValidationError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }
}

impl TokenValidator for JwtTokenValidator {
    fn validate(&self, token: &str) -> Result<ValidatedToken, ValidationError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        validated_from_claims(data.claims)
    }
}

// `exp` and `iss`/`aud` are already enforced; this lifts the claims into the app-side type.
fn validated_from_claims(claims: Claims) -> Result<ValidatedToken, ValidationError> {
    let subject = claims
        .get("sub")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::EmptyClaim("sub"))?
        .to_string();

    let expires_at = claims
        .get("exp")
        .and_then(Value::as_i64)
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
        .ok_or(ValidationError::InvalidExpiry)?;

    Ok(ValidatedToken {
        subject,
        expires_at,
        claims,
    })
}
