//! token.rs
//!
//! Выпуск и проверка JWT (HS256). Токен живёт ровно час, механизма
//! обновления нет: по истечении нужно заново пройти `/jwt`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const TOKEN_TTL_SECS: i64 = 3600;

/// Полезная нагрузка проверенного токена.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

// POST /jwt
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IdentityPayload {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
}

pub fn issue_token(email: &str, secret: &str) -> Result<String, TokenError> {
    issue_token_at(email, secret, Utc::now())
}

pub fn issue_token_at(
    email: &str,
    secret: &str,
    issued_at: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = Claims {
        email: email.to_string(),
        iat: issued_at.timestamp(),
        exp: (issued_at + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

/// Проверяет подпись и срок действия. Никаких побочных эффектов.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(TokenError::Rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn fresh_token_exposes_email() {
        let token = issue_token("tenant@example.com", SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.email, "tenant@example.com");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token("tenant@example.com", "another-secret").unwrap();
        assert!(matches!(verify_token(&token, SECRET), Err(TokenError::Rejected(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued_at = Utc::now() - Duration::hours(2);
        let token = issue_token_at("tenant@example.com", SECRET, issued_at).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token("not.a.token", SECRET).is_err());
        assert!(verify_token("", SECRET).is_err());
    }
}
