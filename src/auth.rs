use base64::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::algorithms::MACLike;
use jwt_simple::prelude::{Claims, Duration as JwtDuration, HS256Key, VerificationOptions};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::HashSet;

pub const TOKEN_ISSUER: &str = "binday";
pub const TOKEN_TTL_HOURS: u64 = 24;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid auth key")]
    InvalidKey,
    #[error("invalid auth token")]
    InvalidToken,
}

/// Permission snapshot signed into every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PermissionClaims {
    permissions: Vec<u16>,
}

/// Identity and permissions decoded from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: String,
    pub permissions: Vec<u16>,
}

/// Issues and verifies bearer tokens with an explicitly supplied HMAC key.
#[derive(Debug, Clone)]
pub struct AuthState {
    key: HS256Key,
}

impl AuthState {
    pub fn from_encoded_key(raw: &str) -> Result<Self, AuthError> {
        let key_bytes = decode_key(raw)?;
        Ok(Self::from_key_bytes(&key_bytes))
    }

    pub fn from_key_bytes(key_bytes: &[u8]) -> Self {
        Self {
            key: HS256Key::from_bytes(key_bytes),
        }
    }

    pub fn issue_token(&self, user_id: &str, permissions: &[u16]) -> Result<String, AuthError> {
        let custom = PermissionClaims {
            permissions: permissions.to_vec(),
        };
        let claims = Claims::with_custom_claims(custom, JwtDuration::from_hours(TOKEN_TTL_HOURS))
            .with_subject(user_id)
            .with_issuer(TOKEN_ISSUER);
        self.key
            .authenticate(claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Every failure (bad signature, expiry, missing subject) collapses into
    /// `InvalidToken`.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut options = VerificationOptions::default();
        options.allowed_issuers = Some(HashSet::from([TOKEN_ISSUER.to_string()]));

        let claims = self
            .key
            .verify_token::<PermissionClaims>(token, Some(options))
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.expires_at.is_none() {
            return Err(AuthError::InvalidToken);
        }

        let user_id = claims.subject.ok_or(AuthError::InvalidToken)?;
        if user_id.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(TokenClaims {
            user_id,
            permissions: claims.custom.permissions,
        })
    }

    /// A correctly signed token whose lifetime ended a day ago.
    #[cfg(test)]
    pub(crate) fn issue_expired_token(&self, user_id: &str, permissions: &[u16]) -> String {
        use jwt_simple::prelude::Clock;

        let custom = PermissionClaims {
            permissions: permissions.to_vec(),
        };
        let mut claims = Claims::with_custom_claims(custom, JwtDuration::from_hours(TOKEN_TTL_HOURS))
            .with_subject(user_id)
            .with_issuer(TOKEN_ISSUER);
        let now = Clock::now_since_epoch();
        claims.issued_at = Some(now - JwtDuration::from_hours(48));
        claims.invalid_before = Some(now - JwtDuration::from_hours(48));
        claims.expires_at = Some(now - JwtDuration::from_hours(24));
        self.key.authenticate(claims).expect("expired token")
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` header value. Any other
/// scheme yields `None`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme != "Bearer" || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

fn decode_key(raw: &str) -> Result<Vec<u8>, AuthError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidKey);
    }

    let decoded = decode_config(trimmed, URL_SAFE_NO_PAD)
        .or_else(|_| decode_config(trimmed, STANDARD))
        .or_else(|_| decode_config(trimmed, STANDARD_NO_PAD))
        .map_err(|_| AuthError::InvalidKey)?;

    if decoded.is_empty() {
        return Err(AuthError::InvalidKey);
    }

    Ok(decoded)
}

pub fn generate_auth_key() -> Result<String, AuthError> {
    let mut rng = OsRng;
    generate_auth_key_with_rng(&mut rng)
}

pub(crate) fn generate_auth_key_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    let encoded = encode_config(bytes, URL_SAFE_NO_PAD);
    if encoded.is_empty() {
        return Err(AuthError::InvalidKey);
    }
    Ok(encoded)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for value in dest.iter_mut() {
                *value = 0;
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ZeroRng {}

    #[test]
    fn generate_auth_key_with_rng__should_match_fixture() {
        // Given
        let mut rng = ZeroRng;

        // When
        let key = generate_auth_key_with_rng(&mut rng).expect("auth key");

        // Then
        assert_eq!(key, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn verify_token__should_return_embedded_permissions() {
        // Given
        let auth = AuthState::from_key_bytes(b"token-roundtrip-secret");
        let token = auth.issue_token("user-1", &[100, 201]).expect("issue");

        // When
        let claims = auth.verify_token(&token).expect("verify");

        // Then
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.permissions, vec![100, 201]);
    }

    #[test]
    fn verify_token__should_reject_other_key() {
        // Given
        let issuer = AuthState::from_key_bytes(b"issuer-secret");
        let verifier = AuthState::from_key_bytes(b"verifier-secret");
        let token = issuer.issue_token("user-1", &[]).expect("issue");

        // Then
        assert!(matches!(
            verifier.verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn verify_token__should_reject_expired_token() {
        // Given
        let auth = AuthState::from_key_bytes(b"expired-secret");
        let token = auth.issue_expired_token("user-1", &[100]);

        // When
        let result = auth.verify_token(&token);

        // Then
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn verify_token__should_reject_garbage() {
        let auth = AuthState::from_key_bytes(b"garbage-secret");

        assert!(auth.verify_token("not.a.token").is_err());
        assert!(auth.verify_token("").is_err());
    }

    #[test]
    fn bearer_token__should_only_accept_bearer_scheme() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn from_encoded_key__should_reject_empty_key() {
        assert!(matches!(
            AuthState::from_encoded_key("  "),
            Err(AuthError::InvalidKey)
        ));
    }
}
