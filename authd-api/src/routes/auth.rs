/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create an account, email a confirmation code
/// - `POST /v1/auth/login` - Exchange email and password for a token pair
/// - `POST /v1/auth/refresh` - Exchange the current refresh token for a new pair
/// - `POST /v1/auth/confirm-email` - Confirm an email address with its code
/// - `GET  /v1/auth/me` - Current user (bearer)
/// - `POST /v1/auth/logout` - Revoke the current pair (bearer)

use crate::{
    app::{AppState, CurrentUser},
    error::ApiResult,
};
use authd_shared::{models::User, Session};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub repeat_password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Confirm-email request
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 32, message = "Confirmation code is required"))]
    pub confirmation_code: String,
}

/// Body of endpoints that only report success
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// A token and the instant it expires
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Login and refresh response
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "a@x.com", "email_confirmed": false, "created_at": "..." },
///   "access_token": { "token": "eyJ...", "expires_at": "..." },
///   "refresh_token": { "token": "eyJ...", "expires_at": "..." }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub access_token: TokenResponse,
    pub refresh_token: TokenResponse,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user,
            access_token: TokenResponse {
                token: session.access_token,
                expires_at: session.access_expires_at,
            },
            refresh_token: TokenResponse {
                token: session.refresh_token,
                expires_at: session.refresh_expires_at,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
}

/// Register a new user
///
/// No tokens are returned; the user logs in separately. A confirmation code
/// is emailed asynchronously.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Malformed email or empty password
/// - `400 Bad Request`: Passwords differ or email already exists
/// - `500 Internal Server Error`: Store or notifier failure
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    req.validate()?;

    state
        .auth
        .register(&req.email, &req.password, &req.repeat_password)
        .await?;

    Ok(SuccessResponse::ok())
}

/// Log in with email and password
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Malformed request
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    let session = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(session.into()))
}

/// Exchange the current refresh token for a new pair
///
/// The old pair stops working. Presenting a refresh token that has already
/// been exchanged fails with `401`.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    let session = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(session.into()))
}

/// Confirm an email address
///
/// # Errors
///
/// - `400 Bad Request`: `invalid confirmation code`, whatever the reason
pub async fn confirm_email(
    State(state): State<AppState>,
    Json(req): Json<ConfirmEmailRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    req.validate()?;

    state
        .auth
        .confirm_email(&req.email, &req.confirmation_code)
        .await?;

    Ok(SuccessResponse::ok())
}

/// The user owning the bearer token
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse { user })
}

/// Revoke the caller's token pair
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<SuccessResponse>> {
    state.auth.logout(user.id).await?;
    Ok(SuccessResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "a@x.com".into(),
            password: "p1".into(),
            repeat_password: "p1".into(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..valid
        };
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_empty_refresh_token_rejected() {
        let req = RefreshRequest {
            refresh_token: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
