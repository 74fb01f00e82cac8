/*
 * Responsibility
 * - v1 URL layout
 * - the sso routes are public (they establish or end sessions); /me sits behind the access middleware
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware;
use crate::state::AppState;

use crate::api::v1::handlers::{
    health::health,
    me::me,
    sso::{complete_login, logout},
};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new().route("/me", get(me));
    let protected = middleware::auth::access::apply(protected, state);

    Router::new()
        .route("/health", get(health))
        .route("/sso/session", post(complete_login))
        .route("/sso/logout", post(logout))
        .merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const SESSION_TTL: std::time::Duration = std::time::Duration::from_secs(1800);

    use crate::middleware::session_cookie::SessionCookie;
    use crate::services::auth::{
        AuthService, CompletionDispatcher,
        roles::{ClaimsRoleExtractor, RoleSource},
        token_store::InMemoryTokenStore,
        validator::{TokenValidator, ValidatedToken, ValidationError},
    };

    // Accepts "<sub>:<role>,<role>"; "bad-roles:<sub>" yields a malformed realm_access claim.
    struct StaticValidator;

    impl TokenValidator for StaticValidator {
        fn validate(&self, token: &str) -> Result<ValidatedToken, ValidationError> {
            let (sub, roles) = token
                .split_once(':')
                .ok_or(ValidationError::EmptyClaim("sub"))?;
            let realm_access = if sub == "bad-roles" {
                json!({"roles": "admin"})
            } else {
                json!({"roles": roles.split(',').filter(|r| !r.is_empty()).collect::<Vec<_>>()})
            };
            let claims = json!({"sub": sub, "realm_access": realm_access});
            Ok(ValidatedToken {
                subject: sub.to_string(),
                expires_at: Utc::now() + Duration::minutes(5),
                claims: claims.as_object().cloned().unwrap_or_default(),
            })
        }
    }

    fn app() -> (Router, Arc<InMemoryTokenStore>) {
        let store = Arc::new(InMemoryTokenStore::new(SESSION_TTL));
        let dispatcher = CompletionDispatcher::new(
            Arc::new(ClaimsRoleExtractor::new(RoleSource::Realm)),
            store.clone(),
        );
        let auth = Arc::new(AuthService::new(Arc::new(StaticValidator), dispatcher, "sub"));
        let state = AppState::new(
            auth,
            SessionCookie {
                name: "AUTHN_SESSION".into(),
                ttl_seconds: 1800,
                secure: false,
            },
        );
        (routes(state.clone()).with_state(state), store)
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn login(token: &str) -> Request<Body> {
        Request::post("/sso/session")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"access_token": token, "refresh_token": "rt"}).to_string()))
            .unwrap()
    }

    fn session_cookie(resp: &axum::response::Response) -> String {
        let raw = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn login_then_cookie_reuses_cached_account() {
        let (app, store) = app();

        let resp = app.clone().oneshot(login("alice:user,admin")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = session_cookie(&resp);
        assert!(cookie.starts_with("AUTHN_SESSION="));

        let body = json_body(resp).await;
        assert_eq!(body["persisted"], true);
        assert_eq!(body["roles"], json!(["admin", "user"]));
        assert_eq!(store.len().await, 1);

        let resp = app
            .oneshot(
                Request::get("/me")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["principal"], "alice");
        assert_eq!(body["refreshable"], true);
    }

    fn login_with_cookie(token: &str, cookie: &str) -> Request<Body> {
        let mut req = login(token);
        req.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
        req
    }

    fn me_with_cookie(cookie: &str) -> Request<Body> {
        Request::get("/me")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn login_never_adopts_a_presented_session_id() {
        let (app, store) = app();

        let resp = app
            .clone()
            .oneshot(login_with_cookie("victim:user", "AUTHN_SESSION=attacker-chosen"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let issued = session_cookie(&resp);
        assert_ne!(issued, "AUTHN_SESSION=attacker-chosen");
        assert_eq!(store.len().await, 1);

        let resp = app
            .clone()
            .oneshot(me_with_cookie("AUTHN_SESSION=attacker-chosen"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app.oneshot(me_with_cookie(&issued)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["principal"], "victim");
    }

    #[tokio::test]
    async fn relogin_rotates_the_session_id() {
        let (app, store) = app();

        let resp = app.clone().oneshot(login("alice:user")).await.unwrap();
        let first = session_cookie(&resp);

        let resp = app
            .clone()
            .oneshot(login_with_cookie("alice:user,admin", &first))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let second = session_cookie(&resp);
        assert_ne!(first, second);
        // the previous entry is retired, not left to pile up
        assert_eq!(store.len().await, 1);

        let resp = app.clone().oneshot(me_with_cookie(&first)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app.oneshot(me_with_cookie(&second)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["roles"], json!(["admin", "user"]));
    }

    #[tokio::test]
    async fn bearer_call_sets_no_cookie_and_stores_nothing() {
        let (app, store) = app();

        let resp = app
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, "Bearer svc:api-client")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        let body = json_body(resp).await;
        assert_eq!(body["roles"], json!(["api-client"]));
        assert_eq!(body["refreshable"], false);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn unauthenticated_requests_are_rejected() {
        let (app, _) = app();

        let resp = app
            .clone()
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .clone()
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .oneshot(
                Request::get("/me")
                    .header(header::COOKIE, "AUTHN_SESSION=unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_roles_fail_login_without_a_session() {
        let (app, store) = app();

        let resp = app.oneshot(login("bad-roles:x")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(store.len().await, 0);

        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (app, store) = app();

        let resp = app.clone().oneshot(login("alice:user")).await.unwrap();
        let cookie = session_cookie(&resp);

        let resp = app
            .clone()
            .oneshot(
                Request::post("/sso/logout")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(
            resp.headers()[header::SET_COOKIE]
                .to_str()
                .unwrap()
                .contains("Max-Age=0")
        );
        assert_eq!(store.len().await, 0);

        let resp = app
            .oneshot(
                Request::get("/me")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_reports_store_backend() {
        let (app, _) = app();
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["token_store"], "memory");
    }
}
