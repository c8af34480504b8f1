pub mod password;
pub mod reset;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

/// Session token payload: the identity id plus issue/expiry timestamps.
/// `iat` is compared against the credential-rotation timestamp on every
/// protected request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

impl From<JwtError> for crate::error::ApiError {
    fn from(err: JwtError) -> Self {
        tracing::error!("JWT error: {}", err);
        crate::error::ApiError::internal(err.to_string())
    }
}

pub fn generate_jwt(claims: Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, &claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn token_round_trip_preserves_subject() {
        let user_id = Uuid::new_v4();
        let token = generate_jwt(Claims::new(user_id)).unwrap();

        let secret = &config::config().security.jwt_secret;
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id);
        assert!(decoded.claims.exp > decoded.claims.iat);
    }

    #[test]
    fn tampered_token_fails_verification() {
        let token = generate_jwt(Claims::new(Uuid::new_v4())).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');

        let secret = &config::config().security.jwt_secret;
        let result = decode::<Claims>(
            &tampered,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
