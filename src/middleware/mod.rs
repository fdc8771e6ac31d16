use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::models::User;

pub mod jwt;

pub use jwt::{issue_token, verify_token, Claims};

/// Authenticated caller, loaded fresh from storage on every request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve_user(token: &str, state: &crate::AppState) -> Result<Option<User>, ApiError> {
    let claims = match verify_token(token, &state.config.jwt) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("rejected token: {}", e);
            return Ok(None);
        }
    };
    Ok(state.db.fetch_user(claims.sub).await?)
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(ApiError::unauthenticated)?;

        // a deleted user with a live token is rejected too
        resolve_user(token, state)
            .await?
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthenticated("Not authorized, token failed".to_string()))
    }
}

/// `Option<AuthUser>` on public routes: a missing or unusable token reads
/// as anonymous.
impl OptionalFromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(resolve_user(token, state).await?.map(AuthUser)),
            None => Ok(None),
        }
    }
}
