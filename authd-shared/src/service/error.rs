use thiserror::Error;

use crate::notify::NotifyError;
use crate::store::StoreError;

/// Failure of an authentication operation
///
/// Authentication failures (`InvalidCredentials`, `InvalidToken`, `NotFound`)
/// carry detail for logs only; callers facing the outside world should
/// collapse them into one generic "unauthorized".
#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad input, safe to show the caller
    #[error("{0}")]
    Validation(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bad signature, wrong kind, expired, superseded or revoked
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Deliberately undifferentiated
    #[error("invalid confirmation code")]
    Confirmation,

    #[error("storage error: {0}")]
    Storage(StoreError),

    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// A collaborator call ran past its deadline
    #[error("operation cancelled: {0} timed out")]
    Cancelled(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(op) => AuthError::Cancelled(op),
            other => AuthError::Storage(other),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_timeout_becomes_cancelled() {
        let err: AuthError = StoreError::Timeout("save_tokens").into();
        assert!(matches!(err, AuthError::Cancelled("save_tokens")));
    }

    #[test]
    fn test_store_failure_becomes_storage() {
        let err: AuthError = StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, AuthError::Storage(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_confirmation_message_is_generic() {
        assert_eq!(AuthError::Confirmation.to_string(), "invalid confirmation code");
    }
}
