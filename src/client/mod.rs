//! HTTP client for the `/api` surface plus the client-side state stores
//! built on it.

pub mod auth_store;
pub mod session;
pub mod store;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::FieldError;
use crate::models::{AuthData, Envelope, EventData, EventListData, SaveData, StatsData, UserData};
use crate::query::EventFilters;
use crate::validation::{
    CreateEventRequest, LoginRequest, RegisterRequest, UpdateEventRequest, UpdateProfileRequest,
};

pub use auth_store::{AuthState, AuthStore};
pub use session::{SessionStorage, StoredSession, SESSION_KEY};
pub use store::{EventState, EventStore};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
const FALLBACK_MESSAGE: &str = "Something went wrong";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No response at all: connection refused, DNS, timeout.
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network(#[source] reqwest::Error),

    /// The HTTP stack itself could not be built (TLS backend, resolver).
    #[error("http client setup failed: {0}")]
    Setup(#[source] reqwest::Error),

    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("session storage: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Validation { .. } => Some(StatusCode::BAD_REQUEST),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ClientError::Validation { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// `page`/`limit` pairs that are set, url-encoded.
fn window_query(page: Option<u32>, limit: Option<u32>) -> String {
    let pairs: Vec<(&str, u32)> = [("page", page), ("limit", limit)]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect();
    serde_urlencoded::to_string(&pairs).unwrap_or_default()
}

fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// Shared handle: clones see the same session state and storage, so a
/// rejected token observed by any store logs every store out.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<watch::Sender<AuthState>>,
    session: Option<SessionStorage>,
}

impl ApiClient {
    /// `base_url` points at the `/api` prefix, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ClientError::Setup)?;
        let (auth, _) = watch::channel(AuthState::default());
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: Arc::new(auth),
            session: None,
        })
    }

    /// Attaches durable storage and restores a previously saved session.
    pub fn with_session(mut self, storage: SessionStorage) -> Self {
        if let Some(saved) = storage.load() {
            self.auth.send_replace(AuthState {
                user: Some(saved.user),
                token: Some(saved.token),
                ..Default::default()
            });
        }
        self.session = Some(storage);
        self
    }

    pub fn session(&self) -> Option<&SessionStorage> {
        self.session.as_ref()
    }

    pub fn token(&self) -> Option<String> {
        self.auth.borrow().token.clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.auth.send_modify(|s| s.token = token);
    }

    pub(crate) fn auth_state(&self) -> Arc<watch::Sender<AuthState>> {
        Arc::clone(&self.auth)
    }

    /// Resets the shared session state and drops the persisted session.
    pub fn clear_session(&self) {
        self.auth.send_replace(AuthState::default());
        if let Some(storage) = &self.session {
            if let Err(e) = storage.clear() {
                warn!("failed to clear session: {}", e);
            }
        }
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Envelope<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ClientError::Network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::Network)?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()));
        }

        let envelope: Option<Envelope<serde_json::Value>> = serde_json::from_slice(&bytes).ok();
        let (message, errors) = match envelope {
            Some(env) => (env.message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()), env.errors),
            None => (FALLBACK_MESSAGE.to_string(), Vec::new()),
        };

        if status == StatusCode::UNAUTHORIZED {
            self.clear_session();
        }
        if status == StatusCode::BAD_REQUEST && !errors.is_empty() {
            return Err(ClientError::Validation { message, errors });
        }
        Err(ClientError::Api { status, message })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ClientError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    fn require<T>(envelope: Envelope<T>) -> Result<T, ClientError> {
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response carried no data".to_string()))
    }

    pub async fn list_events(
        &self,
        filters: &EventFilters,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<EventListData, ClientError> {
        let query: Vec<String> = [filters.to_query_string(), window_query(page, limit)]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        Self::require(self.get(&with_query("/events", &query.join("&"))).await?)
    }

    pub async fn get_event(&self, id: &str) -> Result<EventData, ClientError> {
        Self::require(self.get(&format!("/events/{id}")).await?)
    }

    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<EventData, ClientError> {
        Self::require(self.send(Method::POST, "/events", Some(request)).await?)
    }

    pub async fn update_event(&self, id: &str, request: &UpdateEventRequest) -> Result<EventData, ClientError> {
        Self::require(self.send(Method::PUT, &format!("/events/{id}"), Some(request)).await?)
    }

    pub async fn delete_event(&self, id: &str) -> Result<(), ClientError> {
        self.send::<(), serde_json::Value>(Method::DELETE, &format!("/events/{id}"), None)
            .await
            .map(|_| ())
    }

    pub async fn toggle_save(&self, id: &str) -> Result<SaveData, ClientError> {
        Self::require(
            self.send::<(), SaveData>(Method::POST, &format!("/events/{id}/save"), None)
                .await?,
        )
    }

    pub async fn saved_events(&self) -> Result<EventListData, ClientError> {
        Self::require(self.get("/events/saved").await?)
    }

    pub async fn my_events(&self, page: Option<u32>, limit: Option<u32>) -> Result<EventListData, ClientError> {
        Self::require(self.get(&with_query("/users/events", &window_query(page, limit))).await?)
    }

    pub async fn dashboard(&self) -> Result<StatsData, ClientError> {
        Self::require(self.get("/users/dashboard").await?)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthData, ClientError> {
        Self::require(self.send(Method::POST, "/auth/register", Some(request)).await?)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthData, ClientError> {
        Self::require(self.send(Method::POST, "/auth/login", Some(request)).await?)
    }

    pub async fn me(&self) -> Result<UserData, ClientError> {
        Self::require(self.get("/auth/me").await?)
    }

    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<UserData, ClientError> {
        Self::require(self.send(Method::PUT, "/auth/profile", Some(request)).await?)
    }
}
