use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(user_id: Uuid, config: &JwtConfig) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::hours(config.expires_in_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

pub fn verify_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(hours: i64) -> JwtConfig {
        JwtConfig { secret: "unit-secret".into(), expires_in_hours: hours }
    }

    #[test]
    fn issued_tokens_verify() {
        let id = Uuid::new_v4();
        let token = issue_token(id, &config(1)).unwrap();
        assert_eq!(verify_token(&token, &config(1)).unwrap().sub, id);
    }

    #[test]
    fn wrong_secret_or_expiry_fails() {
        let token = issue_token(Uuid::new_v4(), &config(1)).unwrap();
        let other = JwtConfig { secret: "other".into(), expires_in_hours: 1 };
        assert!(verify_token(&token, &other).is_err());

        let expired = issue_token(Uuid::new_v4(), &config(-2)).unwrap();
        assert!(verify_token(&expired, &config(1)).is_err());
        assert!(verify_token("garbage", &config(1)).is_err());
    }
}
