/// Common test utilities for integration tests
///
/// Builds the full router over in-memory backends so HTTP flows run
/// without Postgres or Redis. The backends stay reachable through the
/// context for fault injection and for reading sent confirmation codes.

use authd_api::app::{build_router, AppState};
use authd_api::config::Config;
use authd_shared::cache::MemorySessionCache;
use authd_shared::notify::MemoryNotifier;
use authd_shared::store::MemoryCredentialStore;
use authd_shared::AuthService;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::Service as _;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery staple";

/// Test context containing the router and its backends
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryCredentialStore>,
    pub cache: Arc<MemorySessionCache>,
    pub notifier: Arc<MemoryNotifier>,
}

impl TestContext {
    pub fn new() -> Self {
        let vars: HashMap<&str, &str> = [
            ("JWT_SECRET", "test-secret-that-is-at-least-32-characters"),
            ("DATABASE_URL", "postgresql://unused/authd"),
            ("REDIS_URL", "redis://unused:6379"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("test config");

        let store = Arc::new(MemoryCredentialStore::new());
        let cache = Arc::new(MemorySessionCache::new());
        let notifier = Arc::new(MemoryNotifier::new());

        let auth = AuthService::new(
            store.clone(),
            cache.clone(),
            notifier.clone(),
            config.auth_config(),
        );

        let app = build_router(AppState::new(Arc::new(auth), config));

        Self {
            app,
            store,
            cache,
            notifier,
        }
    }

    /// A unique address per test
    pub fn email() -> String {
        format!("test-{}@example.com", Uuid::new_v4())
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        read(self.app.clone().call(request).await.unwrap()).await
    }

    pub async fn with_bearer(&self, method: &str, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        read(self.app.clone().call(request).await.unwrap()).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        read(self.app.clone().call(request).await.unwrap()).await
    }

    /// Registers `email` with [`PASSWORD`]
    pub async fn register(&self, email: &str) {
        let (status, body) = self
            .post(
                "/v1/auth/register",
                serde_json::json!({
                    "email": email,
                    "password": PASSWORD,
                    "repeat_password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    }

    /// Logs in and returns `(access_token, refresh_token)`
    pub async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/v1/auth/login",
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);

        (
            body["access_token"]["token"].as_str().unwrap().to_string(),
            body["refresh_token"]["token"].as_str().unwrap().to_string(),
        )
    }
}

async fn read(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
