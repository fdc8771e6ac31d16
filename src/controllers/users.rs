use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::{Envelope, EventListData, StatsData, UserData};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/profile",
            get(profile).put(super::auth::update_profile),
        )
        .route("/users/events", get(my_events))
        .route("/users/dashboard", get(dashboard))
        .route("/users/account", delete(delete_account))
}

#[derive(Debug, Deserialize)]
pub struct MyEventsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `all` (default), `active` or `inactive`
    pub status: Option<String>,
}

// GET /api/users/profile
async fn profile(AuthUser(user): AuthUser) -> Json<Envelope<UserData>> {
    Json(Envelope::data(UserData { user: user.profile() }))
}

// GET /api/users/events
async fn my_events(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    params: Result<Query<MyEventsQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<EventListData>>> {
    let Query(params) = params?;
    let page = state
        .users()
        .my_events(&user, params.page, params.limit, params.status.as_deref())
        .await?;
    Ok(Json(Envelope::data(EventListData {
        events: page.events,
        pagination: Some(page.pagination),
    })))
}

// GET /api/users/dashboard
async fn dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Envelope<StatsData>>> {
    let stats = state.users().dashboard(&user).await?;
    Ok(Json(Envelope::data(StatsData { stats })))
}

// DELETE /api/users/account
async fn delete_account(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Envelope<()>>> {
    state.users().delete_account(&user).await?;
    Ok(Json(Envelope::message("Account deleted successfully")))
}
