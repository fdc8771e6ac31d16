use async_trait::async_trait;
use std::ops::Deref;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{Event, EventChanges, User};
use crate::query::{EventQuery, PageRequest};

pub mod postgres;
pub mod reference;

pub use postgres::PgDatabase;
pub use reference::ReferenceDb;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{field} is already in use")]
    Duplicate { field: &'static str },

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[async_trait]
pub trait AbstractUsers: Sync + Send {
    /// Fails with [`DatabaseError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Users among `ids`; unknown ids are skipped.
    async fn fetch_users(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<Option<User>>;

    /// Adds `event_id` to the user's saved list if absent, removes it if
    /// present, as one atomic write. Returns the new membership, or `None`
    /// when the user does not exist.
    async fn toggle_saved_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<bool>>;

    /// Deactivates every event the user organizes and removes the user,
    /// all or nothing.
    async fn delete_account(&self, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AbstractEvents: Sync + Send {
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Fetches regardless of `is_active`.
    async fn fetch_event(&self, id: Uuid) -> Result<Option<Event>>;

    /// Events among `ids`, in no particular order.
    async fn fetch_events(&self, ids: &[Uuid]) -> Result<Vec<Event>>;

    /// One page of matches plus the total match count ignoring the window.
    async fn find_events(&self, query: &EventQuery, window: PageRequest)
        -> Result<(Vec<Event>, u64)>;

    async fn count_events(&self, query: &EventQuery) -> Result<u64>;

    async fn update_event(&self, id: Uuid, changes: &EventChanges) -> Result<Option<Event>>;

    /// Hard delete.
    async fn delete_event(&self, id: Uuid) -> Result<bool>;
}

pub trait AbstractDatabase: Sync + Send + AbstractUsers + AbstractEvents {}

impl AbstractDatabase for PgDatabase {}
impl AbstractDatabase for ReferenceDb {}

#[derive(Clone)]
pub enum Database {
    Postgres(PgDatabase),
    /// In-memory store
    Reference(ReferenceDb),
}

impl Deref for Database {
    type Target = dyn AbstractDatabase;

    fn deref(&self) -> &Self::Target {
        match self {
            Database::Postgres(pg) => pg,
            Database::Reference(reference) => reference,
        }
    }
}

impl Database {
    /// Postgres when a url is configured (migrations applied), otherwise
    /// the in-memory store.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        match &config.url {
            Some(url) => {
                let pg = PgDatabase::new(url, config.pool_size).await?;
                pg.run_migrations().await?;
                info!("Database connected");
                Ok(Database::Postgres(pg))
            }
            None => {
                info!("DATABASE_URL not set, using in-memory reference store");
                Ok(Database::reference())
            }
        }
    }

    pub fn reference() -> Self {
        Database::Reference(ReferenceDb::default())
    }
}
