use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::client::{ApiClient, ClientError, StoredSession};
use crate::models::{AuthData, EventView, UserProfile};
use crate::validation::{LoginRequest, RegisterRequest, UpdateProfileRequest};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// Session holder over the client's shared auth state: a 401 seen through
/// any clone of the client resets it. Writes through to storage.
pub struct AuthStore {
    client: ApiClient,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthStore {
    pub fn new(client: ApiClient) -> Self {
        let state = client.auth_state();
        Self { client, state }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn fail(&self, err: &ClientError) {
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.is_loading = false;
            s.error = Some(message);
        });
    }

    fn establish(&self, auth: AuthData) -> Result<UserProfile, ClientError> {
        if let Some(storage) = self.client.session() {
            storage.save(&StoredSession {
                user: auth.user.clone(),
                token: auth.token.clone(),
            })?;
        }
        let user = auth.user.clone();
        self.state.send_replace(AuthState {
            user: Some(auth.user),
            token: Some(auth.token),
            is_loading: false,
            error: None,
        });
        Ok(user)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<UserProfile, ClientError> {
        self.begin();
        match self.client.login(request).await {
            Ok(auth) => self.establish(auth),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        self.begin();
        match self.client.register(request).await {
            Ok(auth) => {
                info!("registered {}", auth.user.email);
                self.establish(auth)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Clears memory and durable storage together.
    pub fn logout(&self) {
        self.client.clear_session();
        self.state.send_replace(AuthState::default());
    }

    /// Reloads the user behind the stored token; any failure logs out.
    pub async fn refresh_current_user(&self) -> Option<UserProfile> {
        self.client.token()?;
        match self.client.me().await {
            Ok(data) => {
                let user = data.user;
                if let (Some(storage), Some(token)) = (self.client.session(), self.client.token()) {
                    let _ = storage.save(&StoredSession {
                        user: user.clone(),
                        token,
                    });
                }
                self.state.send_modify(|s| s.user = Some(user.clone()));
                Some(user)
            }
            Err(_) => {
                self.logout();
                None
            }
        }
    }

    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<UserProfile, ClientError> {
        self.begin();
        match self.client.update_profile(request).await {
            Ok(data) => {
                let user = data.user;
                if let (Some(storage), Some(token)) = (self.client.session(), self.client.token()) {
                    storage.save(&StoredSession {
                        user: user.clone(),
                        token,
                    })?;
                }
                self.state.send_modify(|s| {
                    s.user = Some(user.clone());
                    s.is_loading = false;
                });
                Ok(user)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    self.logout();
                }
                self.fail(&e);
                Err(e)
            }
        }
    }

    pub fn is_event_organizer(&self, event: &EventView) -> bool {
        let state = self.state.borrow();
        match (&state.user, event.organizer_id()) {
            (Some(user), Some(organizer)) => user.id == organizer,
            _ => false,
        }
    }
}
