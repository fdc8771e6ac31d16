use tracing::info;
use validator::Validate;

use crate::database::DatabaseError;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::middleware::issue_token;
use crate::models::{DashboardStats, EventView, User, UserProfile};
use crate::query::{EventQuery, Page, PageRequest, Pagination, StatusFilter};
use crate::validation::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::AppState;

fn email_taken() -> ApiError {
    ApiError::Validation(vec![FieldError::new("email", "User already exists with this email")])
}

fn bad_credentials() -> ApiError {
    ApiError::Unauthenticated("Invalid email or password".to_string())
}

/// Profile plus a freshly issued bearer token.
#[derive(Debug)]
pub struct Session {
    pub user: UserProfile,
    pub token: String,
}

pub struct UserService<'a> {
    state: &'a AppState,
}

impl<'a> UserService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn session(&self, user: &User) -> ApiResult<Session> {
        Ok(Session {
            user: user.profile(),
            token: issue_token(user.id, &self.state.config.jwt)?,
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> ApiResult<Session> {
        let request = request.normalize();
        request.validate()?;
        let (Some(name), Some(email), Some(password)) = (request.name, request.email, request.password) else {
            return Err(ApiError::BadRequest("Name, email and password are required".to_string()));
        };

        if self.state.db.fetch_user_by_email(&email).await?.is_some() {
            return Err(email_taken());
        }

        let hash = User::hash_password(password, self.state.config.security.bcrypt_cost).await?;
        let user = User::new(name, email, hash);
        match self.state.db.insert_user(&user).await {
            Ok(()) => {}
            Err(DatabaseError::Duplicate { .. }) => return Err(email_taken()),
            Err(e) => return Err(e.into()),
        }

        info!("User {} registered", user.id);
        self.session(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<Session> {
        let request = request.normalize();
        request.validate()?;
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(bad_credentials());
        };

        let user = self
            .state
            .db
            .fetch_user_by_email(&email)
            .await?
            .ok_or_else(bad_credentials)?;

        if !user.verify_password(password).await {
            return Err(bad_credentials());
        }
        self.session(&user)
    }

    pub async fn update_profile(&self, user: &User, request: UpdateProfileRequest) -> ApiResult<UserProfile> {
        let request = request.normalize();
        request.validate()?;

        let Some(name) = request.name else {
            return Ok(user.profile());
        };
        let updated = self
            .state
            .db
            .update_user_name(user.id, &name)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        // cached listings embed the organizer name
        self.state.cache.invalidate_listings().await;
        Ok(updated.profile())
    }

    /// Counts straight from storage; `saved_events` counts raw references.
    pub async fn dashboard(&self, user: &User) -> ApiResult<DashboardStats> {
        let all = EventQuery::organized_by(user.id, StatusFilter::All);
        let active = EventQuery::organized_by(user.id, StatusFilter::Active);

        let (total_events, active_events) = futures::try_join!(
            self.state.db.count_events(&all),
            self.state.db.count_events(&active),
        )?;

        Ok(DashboardStats {
            total_events,
            active_events,
            saved_events: user.saved_events.len() as u64,
        })
    }

    pub async fn my_events(
        &self,
        user: &User,
        page: Option<u32>,
        limit: Option<u32>,
        status: Option<&str>,
    ) -> ApiResult<Page<EventView>> {
        let query = EventQuery::organized_by(user.id, StatusFilter::parse(status));
        let window = PageRequest::new(page, limit, self.state.config.pagination.my_events_limit);

        let (events, total_count) = self.state.db.find_events(&query, window).await?;
        let events = self
            .state
            .events()
            .populate(events, false)
            .await?
            .into_iter()
            .map(|view| view.with_saved(&user.saved_events))
            .collect();

        Ok(Page {
            events,
            pagination: Pagination::new(window, total_count),
        })
    }

    /// Deactivates (not deletes) the user's events, then removes the user.
    pub async fn delete_account(&self, user: &User) -> ApiResult<()> {
        if !self.state.db.delete_account(user.id).await? {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        self.state.cache.invalidate_listings().await;
        info!("Account {} deleted", user.id);
        Ok(())
    }
}
