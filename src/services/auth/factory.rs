//! Factory: build `AuthService` from application `Config`.
use std::{sync::Arc, time::Duration};

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::{
    AuthService,
    completion::CompletionDispatcher,
    roles::ClaimsRoleExtractor,
    token_store::{InMemoryTokenStore, TokenStore, ValkeyTokenStore},
    validator::JwtTokenValidator,
};

pub async fn build_auth_service(config: &Config) -> Result<Arc<AuthService>, AppError> {
    let validator = JwtTokenValidator::new(
        &config.access_jwt_public_key_pem,
        config.access_jwt_algorithm,
        &config.auth_issuer,
        &config.auth_audience,
        config.access_token_leeway_seconds,
    )
    .map_err(|err| {
        tracing::error!(error = %err, "failed to build access token validator");
        AppError::Internal
    })?;

    let store = build_token_store(config).await?;
    tracing::info!(backend = store.backend_name(), "token store ready");

    let dispatcher = CompletionDispatcher::new(
        Arc::new(ClaimsRoleExtractor::new(config.role_source.clone())),
        store,
    );

    Ok(Arc::new(AuthService::new(
        Arc::new(validator),
        dispatcher,
        config.principal_attribute.clone(),
    )))
}

async fn build_token_store(config: &Config) -> Result<Arc<dyn TokenStore>, AppError> {
    let Some(url) = config.token_store_url.as_deref() else {
        return Ok(Arc::new(InMemoryTokenStore::new(Duration::from_secs(
            config.session_ttl_seconds,
        ))));
    };

    let store = ValkeyTokenStore::connect(
        url,
        config.token_store_prefix.clone(),
        Duration::from_secs(config.session_ttl_seconds),
    )
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "failed to connect token store");
        AppError::Internal
    })?;

    Ok(Arc::new(store))
}
