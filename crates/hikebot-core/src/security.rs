use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AuthUser, UserId};

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
    #[error("Cryptographic operation failed: {0}")]
    CryptographicFailure(String),
}

static USER_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]{4,16}$").unwrap_or_else(|e| panic!("invalid user code regex: {e}"))
});

/// A user code is 4 to 16 ASCII letters or digits.
pub fn is_valid_user_code(code: &str) -> bool {
    USER_CODE_RE.is_match(code)
}

pub fn hash_password(password: &str) -> Result<String, SecurityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SecurityError::CryptographicFailure(e.to_string()))
}

/// Returns `Ok(false)` on mismatch; errors only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, SecurityError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| SecurityError::CryptographicFailure(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub user_code: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 bearer token issuer and validator
pub struct JwtManager {
    secret: SecretString,
    ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: SecretString, ttl_hours: i64) -> Self {
        Self {
            secret,
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn create_token(&self, user: &AuthUser) -> Result<String, SecurityError> {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            user_code: user.user_code.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| SecurityError::TokenGeneration(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, SecurityError> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| SecurityError::InvalidCredentials)
    }
}

/// Security event logging
#[derive(Debug, Clone)]
pub enum SecurityEvent {
    SignupSuccess {
        user_id: UserId,
        username: String,
    },
    AuthenticationFailure {
        username: String,
        method: &'static str,
        reason: String,
    },
    AuthenticationSuccess {
        user_id: UserId,
        method: &'static str,
    },
    PermissionDenied {
        user_id: UserId,
        resource: String,
        reason: String,
    },
}

pub struct SecurityLogger;

impl SecurityLogger {
    pub fn log_event(event: SecurityEvent) {
        use tracing::{debug, info, warn};

        match event {
            SecurityEvent::SignupSuccess { user_id, username } => {
                info!(user_id, username = %username, "Account created");
            }
            SecurityEvent::AuthenticationFailure {
                username,
                method,
                reason,
            } => {
                warn!(
                    username = %username,
                    method,
                    reason = %reason,
                    "Authentication failure"
                );
            }
            SecurityEvent::AuthenticationSuccess { user_id, method } => {
                debug!(user_id, method, "Authentication success");
            }
            SecurityEvent::PermissionDenied {
                user_id,
                resource,
                reason,
            } => {
                warn!(
                    user_id,
                    resource = %resource,
                    reason = %reason,
                    "Permission denied"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AuthUser {
        AuthUser {
            id: 7,
            username: "alice".to_string(),
            user_code: "ALICE1".to_string(),
        }
    }

    #[test]
    fn test_user_code_rules() {
        assert!(is_valid_user_code("abcd"));
        assert!(is_valid_user_code("A1b2C3d4E5f6G7h8"));
        assert!(!is_valid_user_code("abc"));
        assert!(!is_valid_user_code("A1b2C3d4E5f6G7h8X"));
        assert!(!is_valid_user_code("ab-cd"));
        assert!(!is_valid_user_code(""));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("trailmix").unwrap();
        assert_ne!(hash, "trailmix");
        assert!(verify_password("trailmix", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(verify_password("trailmix", "not-a-hash").is_err());
    }

    #[test]
    fn test_jwt_create_and_validate() {
        let manager = JwtManager::new(SecretString::from("unit-test-secret".to_string()), 1);
        let token = manager.create_token(&alice()).unwrap();
        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");

        let other = JwtManager::new(SecretString::from("another-secret".to_string()), 1);
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new(SecretString::from("unit-test-secret".to_string()), -2);
        let token = manager.create_token(&alice()).unwrap();
        assert!(matches!(
            manager.validate_token(&token),
            Err(SecurityError::InvalidCredentials)
        ));
    }
}
