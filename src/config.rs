/*
 * Responsibility
 * - Read settings from the environment (.env supported via dotenvy)
 * - Validate them: missing or unparsable values fail startup
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::services::auth::{roles::RoleSource, validator::JwtAlgorithm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // access-token validation
    pub auth_issuer: String,
    pub auth_audience: String,
    pub access_token_leeway_seconds: u64,
    pub access_jwt_public_key_pem: String,
    pub access_jwt_algorithm: JwtAlgorithm,

    // completion
    pub role_source: RoleSource,
    pub principal_attribute: String,

    // session + token store
    pub session_cookie_name: String,
    pub session_ttl_seconds: u64,
    pub token_store_url: Option<String>,
    pub token_store_prefix: String,

    // http
    pub request_timeout_seconds: u64,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let auth_issuer = required("AUTH_ISSUER")?;
        let auth_audience = required("AUTH_AUDIENCE")?;
        let access_token_leeway_seconds = parse_or(&lookup, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;
        let access_jwt_public_key_pem = required("ACCESS_JWT_PUBLIC_KEY_PEM")?.replace("\\n", "\n");
        let access_jwt_algorithm = match optional("ACCESS_JWT_ALGORITHM") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("ACCESS_JWT_ALGORITHM"))?,
            None => JwtAlgorithm::EdDsa,
        };

        let role_source = match optional("ROLE_SOURCE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("ROLE_SOURCE"))?,
            None => RoleSource::Realm,
        };
        let principal_attribute = optional("PRINCIPAL_ATTRIBUTE").unwrap_or_else(|| "sub".into());

        let session_cookie_name =
            optional("SESSION_COOKIE_NAME").unwrap_or_else(|| "AUTHN_SESSION".into());
        let session_ttl_seconds = parse_or(&lookup, "SESSION_TTL_SECONDS", 1800)?;
        if session_ttl_seconds == 0 {
            return Err(ConfigError::Invalid("SESSION_TTL_SECONDS"));
        }
        let token_store_url = optional("TOKEN_STORE_URL");
        let token_store_prefix =
            optional("TOKEN_STORE_PREFIX").unwrap_or_else(|| "authn:account".into());

        let request_timeout_seconds = parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30)?;
        let request_body_limit_bytes = parse_or(&lookup, "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Self {
            addr,
            app_env,
            auth_issuer,
            auth_audience,
            access_token_leeway_seconds,
            access_jwt_public_key_pem,
            access_jwt_algorithm,
            role_source,
            principal_attribute,
            session_cookie_name,
            session_ttl_seconds,
            token_store_url,
            token_store_prefix,
            request_timeout_seconds,
            request_body_limit_bytes,
        })
    }
}

// Unset → default; set but unparsable → error.
fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("AUTH_ISSUER", "https://idp.example/realms/main"),
        ("AUTH_AUDIENCE", "gateway"),
        ("ACCESS_JWT_PUBLIC_KEY_PEM", "-----BEGIN PUBLIC KEY-----\\nabc\\n-----END PUBLIC KEY-----"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.access_jwt_algorithm, JwtAlgorithm::EdDsa);
        assert_eq!(config.role_source, RoleSource::Realm);
        assert_eq!(config.principal_attribute, "sub");
        assert_eq!(config.session_cookie_name, "AUTHN_SESSION");
        assert_eq!(config.session_ttl_seconds, 1800);
        assert_eq!(config.token_store_url, None);
        assert_eq!(config.request_body_limit_bytes, 1024 * 1024);
        assert!(config.access_jwt_public_key_pem.contains('\n'));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("APP_ENV", "prod"),
            ("ACCESS_JWT_ALGORITHM", "RS256"),
            ("ROLE_SOURCE", "resource:gateway"),
            ("PRINCIPAL_ATTRIBUTE", "preferred_username"),
            ("TOKEN_STORE_URL", "redis://localhost:6379"),
            ("SESSION_TTL_SECONDS", "60"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert!(config.app_env.is_production());
        assert_eq!(config.access_jwt_algorithm, JwtAlgorithm::Rs256);
        assert_eq!(config.role_source, RoleSource::Resource("gateway".into()));
        assert_eq!(config.principal_attribute, "preferred_username");
        assert_eq!(config.token_store_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.session_ttl_seconds, 60);
    }

    #[test]
    fn missing_required_value() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"));
    }

    #[test]
    fn invalid_values() {
        for (key, value) in [
            ("PORT", "http"),
            ("ROLE_SOURCE", "groups"),
            ("SESSION_TTL_SECONDS", "0"),
            ("ACCESS_JWT_ALGORITHM", "none"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, value));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert_eq!(err, ConfigError::Invalid(key));
        }
    }
}
