//! Session token validation
//!
//! Sessions are HS256 JWTs minted by the sign-in flow with the shared
//! `JWT_SECRET`. This service only verifies them to learn who is calling.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::MIN_JWT_SECRET_LEN;
use crate::types::FaceoffError;

/// Payload carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    /// Display handle, if the provider supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
pub struct SessionValidator {
    secret: String,
}

impl SessionValidator {
    /// Returns an error if the secret is missing or too short
    pub fn new(secret: String) -> Result<Self, FaceoffError> {
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(FaceoffError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )));
        }
        Ok(Self { secret })
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> Result<SessionClaims, FaceoffError> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            let msg = match err.kind() {
                ErrorKind::ExpiredSignature => "Session expired",
                ErrorKind::InvalidSignature => "Invalid session signature",
                _ => "Invalid session token",
            };
            FaceoffError::Unauthorized(msg.into())
        })
    }

    /// Resolve the caller from an `Authorization` header value
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<SessionClaims, FaceoffError> {
        let token = extract_token_from_header(auth_header)
            .ok_or_else(|| FaceoffError::Unauthorized("Unauthorized".into()))?;
        self.verify(token)
    }

    /// Like `authenticate`, but a missing header means an anonymous caller.
    /// A header that is present and invalid is still an error.
    pub fn authenticate_optional(
        &self,
        auth_header: Option<&str>,
    ) -> Result<Option<SessionClaims>, FaceoffError> {
        match extract_token_from_header(auth_header) {
            Some(token) => self.verify(token).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
impl SessionValidator {
    /// Mint a token for `user_id`; sessions come from the sign-in flow
    /// outside tests
    pub fn issue(
        &self,
        user_id: &str,
        username: Option<&str>,
        ttl_secs: u64,
    ) -> Result<String, FaceoffError> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| FaceoffError::Internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = SessionClaims {
            sub: user_id.to_string(),
            username: username.map(str::to_string),
            iat: now,
            exp: now + ttl_secs,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SessionValidator {
        SessionValidator::new("test-secret-that-is-at-least-32-characters-long".into()).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let v = validator();
        let token = v.issue("user-1", Some("ferris"), 3600).unwrap();
        let claims = v.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username.as_deref(), Some("ferris"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other =
            SessionValidator::new("different-secret-that-is-at-least-32-characters".into())
                .unwrap();
        let token = other.issue("user-1", None, 3600).unwrap();
        assert!(matches!(
            validator().verify(&token),
            Err(FaceoffError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            SessionValidator::new("short".into()),
            Err(FaceoffError::Config(_))
        ));
    }

    #[test]
    fn test_authenticate_header_forms() {
        let v = validator();
        let token = v.issue("u", None, 3600).unwrap();
        let bearer = format!("Bearer {}", token);

        assert_eq!(v.authenticate(Some(&bearer)).unwrap().sub, "u");
        assert_eq!(v.authenticate(Some(&token)).unwrap().sub, "u");
        assert!(v.authenticate(None).is_err());
        assert!(v.authenticate(Some("Basic abc def")).is_err());

        assert!(v.authenticate_optional(None).unwrap().is_none());
        assert!(v.authenticate_optional(Some("Bearer garbage")).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_token_from_header(Some("abc")), Some("abc"));
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
