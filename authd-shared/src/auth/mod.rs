/// Authentication primitives
///
/// Building blocks the authentication core composes:
///
/// # Modules
///
/// - [`jwt`]: HS256 token codec for access and refresh tokens
/// - [`password`]: Argon2id password hashing and verification
/// - [`code`]: Confirmation code generation and constant-time comparison
///
/// # Example
///
/// ```no_run
/// use authd_shared::auth::jwt::{TokenCodec, TokenKind};
/// use authd_shared::auth::password::{hash_password, verify_password};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let codec = TokenCodec::new("secret-key-at-least-32-bytes-long!!");
/// let issued = codec.issue(Uuid::new_v4(), "a@x.com", TokenKind::Access, Duration::minutes(15))?;
/// let user_id = codec.extract_user_id(&issued.token)?;
/// # Ok(())
/// # }
/// ```

pub mod code;
pub mod jwt;
pub mod password;
