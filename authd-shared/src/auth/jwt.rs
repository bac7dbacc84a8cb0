/// Token codec for access and refresh tokens
///
/// Tokens are HS256-signed JWTs whose payload carries the user identity and
/// expiry. The codec is a pure function of its secret: it never touches the
/// credential store or the session cache, so a token that decodes here only
/// proves it *was* issued by this service. Whether it is still the current
/// token for its user is decided by the authentication core.
///
/// # Payload
///
/// ```json
/// {
///   "user_id": "0b6f…",
///   "email": "a@x.com",
///   "iat": 1717200000,
///   "exp": 1717200900,
///   "typ": "access",
///   "jti": "5c1e…"
/// }
/// ```
///
/// `typ` keeps an access token from being replayed as a refresh token and
/// vice versa. `jti` makes every issued token distinct, even when two pairs
/// for the same user are minted within the same second.
///
/// # Example
///
/// ```
/// use authd_shared::auth::jwt::{TokenCodec, TokenKind};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = TokenCodec::new("your-secret-key-at-least-32-bytes");
/// let user_id = Uuid::new_v4();
///
/// let issued = codec.issue(user_id, "a@x.com", TokenKind::Access, Duration::minutes(15))?;
/// let claims = codec.decode(&issued.token, TokenKind::Access)?;
/// assert_eq!(claims.user_id, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to sign a token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, structure or claim validation failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token's embedded expiry has passed
    #[error("Token has expired")]
    Expired,

    /// Token decoded but is the wrong kind for this use
    #[error("Expected {expected} token, got {actual} token")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Which half of a token pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived, presented on every request
    Access,

    /// Longer-lived, only used to mint a new pair
    Refresh,
}

impl TokenKind {
    /// Gets token kind as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Owner of the token
    pub user_id: Uuid,

    /// Owner's email at issue time
    pub email: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Access or refresh
    pub typ: TokenKind,

    /// Unique token id
    pub jti: Uuid,
}

impl Claims {
    /// Checks if the embedded expiry has passed
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// A freshly signed token and the instant it stops being valid
///
/// `expires_at` is exactly the `exp` claim, so the value persisted next to the
/// token in the credential store agrees with what the signature enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Stateless HS256 signer/verifier built from one immutable secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Creates a codec for the given secret
    ///
    /// The secret should be at least 32 bytes; the API configuration refuses
    /// to start with anything shorter.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs a new token of `kind` for the user, valid for `ttl`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if the expiry is out of range or
    /// signing fails.
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let exp = (now + ttl).timestamp();
        let expires_at = DateTime::<Utc>::from_timestamp(exp, 0)
            .ok_or_else(|| JwtError::CreateError(format!("expiry out of range: {}", exp)))?;

        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp,
            typ: kind,
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies signature and expiry and checks the token is of `kind`
    pub fn decode(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError> {
        let claims = self.decode_any(token)?;

        if claims.typ != kind {
            return Err(JwtError::WrongKind {
                expected: kind.as_str(),
                actual: claims.typ.as_str(),
            });
        }

        Ok(claims)
    }

    /// Verifies signature and expiry and returns the owner, whatever the kind
    pub fn extract_user_id(&self, token: &str) -> Result<Uuid, JwtError> {
        Ok(self.decode_any(token)?.user_id)
    }

    fn decode_any(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::ValidationError(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

/// Short, non-reversible token identifier safe to put in logs
///
/// First 8 bytes of the SHA-256 of the token, hex encoded.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_issue_and_decode_access() {
        let codec = TokenCodec::new(SECRET);
        let user_id = Uuid::new_v4();

        let issued = codec
            .issue(user_id, "a@x.com", TokenKind::Access, Duration::minutes(15))
            .expect("Should issue token");

        let claims = codec
            .decode(&issued.token, TokenKind::Access)
            .expect("Should decode token");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_expires_at_matches_ttl() {
        let codec = TokenCodec::new(SECRET);
        let issued = codec
            .issue(Uuid::new_v4(), "a@x.com", TokenKind::Refresh, Duration::hours(1))
            .unwrap();

        let left = (issued.expires_at - Utc::now()).num_seconds();
        assert!(left > 3500);
        assert!(left <= 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = TokenCodec::new("secret-one-secret-one-secret-one!!")
            .issue(Uuid::new_v4(), "a@x.com", TokenKind::Access, Duration::minutes(5))
            .unwrap();

        let result = TokenCodec::new("secret-two-secret-two-secret-two!!").extract_user_id(&issued.token);
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = TokenCodec::new(SECRET);
        let issued = codec
            .issue(Uuid::new_v4(), "a@x.com", TokenKind::Access, Duration::seconds(-3600))
            .unwrap();

        let result = codec.decode(&issued.token, TokenKind::Access);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_kind_is_enforced() {
        let codec = TokenCodec::new(SECRET);
        let user_id = Uuid::new_v4();
        let access = codec
            .issue(user_id, "a@x.com", TokenKind::Access, Duration::minutes(5))
            .unwrap();
        let refresh = codec
            .issue(user_id, "a@x.com", TokenKind::Refresh, Duration::days(7))
            .unwrap();

        assert!(matches!(
            codec.decode(&access.token, TokenKind::Refresh),
            Err(JwtError::WrongKind { expected: "refresh", actual: "access" })
        ));
        assert!(codec.decode(&refresh.token, TokenKind::Access).is_err());

        // extract_user_id does not care about the kind
        assert_eq!(codec.extract_user_id(&access.token).unwrap(), user_id);
        assert_eq!(codec.extract_user_id(&refresh.token).unwrap(), user_id);
    }

    #[test]
    fn test_same_second_tokens_differ() {
        let codec = TokenCodec::new(SECRET);
        let user_id = Uuid::new_v4();

        let a = codec
            .issue(user_id, "a@x.com", TokenKind::Access, Duration::minutes(5))
            .unwrap();
        let b = codec
            .issue(user_id, "a@x.com", TokenKind::Access, Duration::minutes(5))
            .unwrap();

        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = TokenCodec::new(SECRET);
        assert!(codec.extract_user_id("not.a.jwt").is_err());
        assert!(codec.extract_user_id("").is_err());
    }

    #[test]
    fn test_fingerprint() {
        let fp = fingerprint("some-token");
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, fingerprint("some-token"));
        assert_ne!(fp, fingerprint("other-token"));
    }
}
