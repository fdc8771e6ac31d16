pub mod cache;
pub mod client;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod query;
pub mod redis_client;
pub mod services;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::cache::CacheService;
use crate::config::Config;
use crate::database::Database;
use crate::redis_client::RedisClient;
use crate::services::{EventService, UserService};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: CacheService,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let db = Database::connect(&config.database).await?;
        let redis = RedisClient::connect_optional(config.redis.url.as_deref()).await;
        let cache = CacheService::new(redis, config.redis.listing_ttl_seconds);
        Ok(Self::with_parts(db, cache, config))
    }

    pub fn with_parts(db: Database, cache: CacheService, config: Config) -> Arc<Self> {
        Arc::new(Self { db, cache, config })
    }

    pub fn events(&self) -> EventService<'_> {
        EventService::new(self)
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(self)
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Full HTTP surface: banner, health probe and the `/api` tree.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(|| async { "EventHub API v1.0" }))
        .route(
            "/health",
            get(|| async {
                Json(json!({
                    "success": true,
                    "message": "OK",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }))
            }),
        )
        .nest("/api", controllers::routes())
        .fallback(controllers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
