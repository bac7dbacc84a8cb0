/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use authd_api::{app::{build_router, AppState}, config::Config};
/// use authd_shared::{cache::MemorySessionCache, notify::MemoryNotifier};
/// use authd_shared::{store::MemoryCredentialStore, AuthService};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let auth = AuthService::new(
///     Arc::new(MemoryCredentialStore::new()),
///     Arc::new(MemorySessionCache::new()),
///     Arc::new(MemoryNotifier::new()),
///     config.auth_config(),
/// );
///
/// let app = build_router(AppState::new(Arc::new(auth), config));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use authd_shared::{models::User, AuthService};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Authentication core
    pub auth: Arc<AuthService>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, config: Config) -> Self {
        Self {
            auth,
            config: Arc::new(config),
        }
    }
}

/// The user behind the bearer token, inserted by [`require_session`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Builds the router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// └── /v1/auth/
///     ├── POST /register
///     ├── POST /login
///     ├── POST /refresh
///     ├── POST /confirm-email
///     ├── GET  /me        (bearer)
///     └── POST /logout    (bearer)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/confirm-email", post(routes::auth::confirm_email));

    let session_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route("/logout", post(routes::auth::logout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let v1_routes = Router::new().nest("/auth", public_auth_routes.merge(session_routes));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Resolves `Authorization: Bearer <access token>` to a user
///
/// Runs the full validation path (signature, then latest-token equality),
/// so a logged-out or superseded token is rejected here.
async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let user = state.auth.me(&token).await?;
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
