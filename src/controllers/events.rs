use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::{Envelope, EventData, EventListData, SaveData};
use crate::query::EventFilters;
use crate::validation::{CreateEventRequest, UpdateEventRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/saved", get(saved_events))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{id}/save", post(toggle_save))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListEventsQuery {
    fn filters(&self) -> EventFilters {
        EventFilters {
            category: self.category.clone(),
            search: self.search.clone(),
            date: self.date.clone(),
            location: self.location.clone(),
            price: self.price.clone(),
            sort_by: self.sort_by.clone(),
        }
    }
}

// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
    viewer: Option<AuthUser>,
    params: Result<Query<ListEventsQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<EventListData>>> {
    let Query(params) = params?;
    let viewer = viewer.map(|AuthUser(user)| user);

    let page = state
        .events()
        .list(&params.filters(), params.page, params.limit, viewer.as_ref())
        .await?;

    Ok(Json(Envelope::data(EventListData {
        events: page.events,
        pagination: Some(page.pagination),
    })))
}

// GET /api/events/saved
async fn saved_events(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Envelope<EventListData>>> {
    let events = state.events().saved(&user).await?;
    Ok(Json(Envelope::data(EventListData { events, pagination: None })))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    viewer: Option<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<EventData>>> {
    let viewer = viewer.map(|AuthUser(user)| user);
    let event = state.events().get(&id, viewer.as_ref()).await?;
    Ok(Json(Envelope::data(EventData { event })))
}

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<EventData>>)> {
    let Json(request) = body?;
    let event = state.events().create(request, &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Event created successfully", EventData { event })),
    ))
}

// PUT /api/events/{id}
async fn update_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<EventData>>> {
    let Json(request) = body?;
    let event = state.events().update(&id, request, &user).await?;
    Ok(Json(Envelope::with_message("Event updated successfully", EventData { event })))
}

// DELETE /api/events/{id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    state.events().delete(&id, &user).await?;
    Ok(Json(Envelope::message("Event deleted successfully")))
}

// POST /api/events/{id}/save
async fn toggle_save(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<SaveData>>> {
    let is_saved = state.events().toggle_save(&id, &user).await?;
    let message = if is_saved {
        "Event saved successfully"
    } else {
        "Event removed from saved events"
    };
    Ok(Json(Envelope::with_message(message, SaveData { is_saved })))
}
