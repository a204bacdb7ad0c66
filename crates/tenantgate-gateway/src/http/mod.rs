//! HTTP server for the gateway.
//!
//! Provides endpoints for:
//! - Bootstrap join (`/bootstrap/join`)
//! - Bootstrap auth (`/bootstrap/auth`)
//! - Health check (`/health`)
//!
//! The bootstrap routes are only mounted when bootstrap is enabled.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().route("/health", get(handlers::health_check));

    if state.bootstrap_enabled {
        router = router
            .route("/bootstrap/join", get(handlers::join))
            .route("/bootstrap/auth", post(handlers::auth));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use tower::ServiceExt;

    use tenantgate_core::crypto::{verify_detached, EphemeralKeyPair, IdentityKey};
    use tenantgate_core::BootstrapToken;

    use crate::bootstrap::BootstrapCoordinator;
    use crate::http::responses::{BootstrapAuthResponse, BootstrapJoinResponse, ErrorResponse};
    use crate::storage::{MemoryTenantStore, MemoryTokenStore, TokenStore};

    struct Harness {
        identity: Arc<IdentityKey>,
        tokens: Arc<MemoryTokenStore>,
        router: Router,
    }

    fn harness(bootstrap_enabled: bool) -> Harness {
        let identity = Arc::new(IdentityKey::generate());
        let tokens = Arc::new(MemoryTokenStore::new());
        let coordinator = BootstrapCoordinator::new(
            Arc::clone(&identity),
            tokens.clone(),
            Arc::new(MemoryTenantStore::new()),
            Duration::from_secs(5),
        );
        let state = AppState::new(coordinator, bootstrap_enabled);
        Harness {
            identity,
            tokens,
            router: create_router(state),
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn auth_request(assertion: Option<&str>, body: String) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/bootstrap/auth")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(assertion) = assertion {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", assertion));
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn auth_body(client_id: &str, public_key: &[u8]) -> String {
        serde_json::json!({
            "client_id": client_id,
            "client_pub_key": STANDARD.encode(public_key),
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(true);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = h.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bootstrap_routes_absent_when_disabled() {
        let h = harness(false);
        let request = Request::builder()
            .uri("/bootstrap/join")
            .body(Body::empty())
            .unwrap();

        let response = h.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_join_returns_signatures() {
        let h = harness(true);
        let token = BootstrapToken::new(vec![0xab, 0x12], b"tok-123".to_vec()).unwrap();
        h.tokens.create_token(token).await.unwrap();

        let request = Request::builder()
            .uri("/bootstrap/join")
            .body(Body::empty())
            .unwrap();
        let response = h.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let join: BootstrapJoinResponse = body_json(response).await;
        assert_eq!(join.signatures.len(), 1);
        let sig = std::str::from_utf8(&join.signatures["ab12"]).unwrap();
        verify_detached(&h.identity.public_key(), sig, b"tok-123").unwrap();
    }

    #[tokio::test]
    async fn test_join_with_credentials_is_bad_request() {
        let h = harness(true);
        h.tokens
            .create_token(BootstrapToken::generate())
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/bootstrap/join")
            .header(header::AUTHORIZATION, "Bearer anything")
            .body(Body::empty())
            .unwrap();
        let response = h.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_join_without_tokens_is_method_not_allowed() {
        let h = harness(true);
        let request = Request::builder()
            .uri("/bootstrap/join")
            .body(Body::empty())
            .unwrap();

        let response = h.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_auth_status_codes() {
        let h = harness(true);
        let token = BootstrapToken::generate();
        h.tokens.create_token(token.clone()).await.unwrap();
        let assertion = h.identity.sign_compact(&token).unwrap();
        let client_pub = EphemeralKeyPair::generate().public_key();

        // Missing credential
        let response = h
            .router
            .clone()
            .oneshot(auth_request(None, auth_body("agent-1", &client_pub)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Malformed body, valid credential
        let response = h
            .router
            .clone()
            .oneshot(auth_request(Some(&assertion), "{not json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Success
        let response = h
            .router
            .clone()
            .oneshot(auth_request(
                Some(&assertion),
                auth_body("agent-1", &client_pub),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let auth: BootstrapAuthResponse = body_json(response).await;
        assert_eq!(auth.server_pub_key.len(), 32);

        // Replay
        let response = h
            .router
            .clone()
            .oneshot(auth_request(
                Some(&assertion),
                auth_body("agent-1", &client_pub),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Invalid client key
        let response = h
            .router
            .oneshot(auth_request(Some(&assertion), auth_body("agent-2", &[1, 2, 3])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.error, "internal error");
    }

    #[tokio::test]
    async fn test_auth_unknown_token_matches_bad_signature() {
        let h = harness(true);
        h.tokens
            .create_token(BootstrapToken::generate())
            .await
            .unwrap();
        let client_pub = EphemeralKeyPair::generate().public_key();

        let unknown = BootstrapToken::generate();
        let unknown_assertion = h.identity.sign_compact(&unknown).unwrap();
        let forged_assertion = IdentityKey::generate().sign_compact(&unknown).unwrap();

        let unknown_response = h
            .router
            .clone()
            .oneshot(auth_request(
                Some(&unknown_assertion),
                auth_body("agent-1", &client_pub),
            ))
            .await
            .unwrap();
        let forged_response = h
            .router
            .oneshot(auth_request(
                Some(&forged_assertion),
                auth_body("agent-1", &client_pub),
            ))
            .await
            .unwrap();

        assert_eq!(unknown_response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(forged_response.status(), StatusCode::UNAUTHORIZED);
        let a: ErrorResponse = body_json(unknown_response).await;
        let b: ErrorResponse = body_json(forged_response).await;
        assert_eq!(a.error, b.error);
    }
}
