use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::{AuthData, Envelope, UserData};
use crate::validation::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/profile", put(update_profile))
}

// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<AuthData>>)> {
    let Json(request) = body?;
    let session = state.users().register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "User registered successfully",
            AuthData { user: session.user, token: session.token },
        )),
    ))
}

// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<AuthData>>> {
    let Json(request) = body?;
    let session = state.users().login(request).await?;
    Ok(Json(Envelope::with_message(
        "Login successful",
        AuthData { user: session.user, token: session.token },
    )))
}

// GET /api/auth/me
async fn me(AuthUser(user): AuthUser) -> Json<Envelope<UserData>> {
    Json(Envelope::data(UserData { user: user.profile() }))
}

// PUT /api/auth/profile
pub(crate) async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<UserData>>> {
    let Json(request) = body?;
    let profile = state.users().update_profile(&user, request).await?;
    Ok(Json(Envelope::with_message(
        "Profile updated successfully",
        UserData { user: profile },
    )))
}
