#![allow(dead_code)]

use chrono::{Duration, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use eventhub::cache::CacheService;
use eventhub::config::Config;
use eventhub::database::Database;
use eventhub::{app, AppState};

/// In-process server on an ephemeral port, backed by the in-memory store.
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub addr: SocketAddr,
    pub http: reqwest::Client,
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestHarness {
    pub async fn new() -> Self {
        let state = AppState::with_parts(Database::reference(), CacheService::disabled(), Config::for_tests());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service()).await.unwrap();
        });

        TestHarness {
            state,
            addr,
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn api_base(&self) -> String {
        self.url("/api")
    }

    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn new_user(&self) -> TestUser {
        let local: String = SafeEmail().fake();
        let email = format!("{}-{}", uuid::Uuid::new_v4().simple(), local).to_lowercase();
        let name: String = Name().fake();
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "Secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        TestUser {
            id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            email,
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates an event owned by `user` and returns its id.
    pub async fn create_event(&self, user: &TestUser, overrides: Value) -> String {
        let mut payload = event_payload();
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), overrides.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        let (status, body) = self
            .call(Method::POST, "/api/events", Some(&user.token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["data"]["event"]["id"].as_str().unwrap().to_string()
    }
}

pub fn tomorrow() -> String {
    (Utc::now() + Duration::days(1)).format("%Y-%m-%d").to_string()
}

pub fn event_payload() -> Value {
    json!({
        "title": "Open air concert",
        "description": "Live music in the park for everyone",
        "date": tomorrow(),
        "time": "19:30",
        "location": { "address": "Central Park, New York" },
        "category": "Music",
        "image": "https://example.com/concert.png",
        "price": 0
    })
}

pub fn ids(body: &Value) -> Vec<String> {
    body["data"]["events"]
        .as_array()
        .map(|events| {
            events
                .iter()
                .filter_map(|e| e["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
