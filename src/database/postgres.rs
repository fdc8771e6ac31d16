use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{AbstractEvents, AbstractUsers, DatabaseError, Result};
use crate::models::{Coordinates, Event, EventChanges, Location, User};
use crate::query::{like_pattern, EventQuery, PageRequest, PriceFilter, SortKey};

const EVENT_COLUMNS: &str = "id, title, description, date, time, address, latitude, longitude, \
     category, image, price, organizer_id, is_active, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, saved_events, created_at, updated_at";

#[derive(Clone)]
pub struct PgDatabase {
    pub pool: Pool<Postgres>,
}

impl PgDatabase {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(PgDatabase { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: String,
    date: DateTime<Utc>,
    time: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    category: String,
    image: String,
    price: f64,
    organizer_id: Uuid,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = DatabaseError;

    fn try_from(row: EventRow) -> Result<Self> {
        let category = row
            .category
            .parse()
            .map_err(|e| DatabaseError::Corrupt(format!("event {}: {e}", row.id)))?;
        let coordinates = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };

        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.date,
            time: row.time,
            location: Location {
                address: row.address,
                coordinates,
            },
            category,
            image: row.image,
            price: row.price,
            organizer_id: row.organizer_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_events(rows: Vec<EventRow>) -> Result<Vec<Event>> {
    rows.into_iter().map(Event::try_from).collect()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Appends the WHERE clause for `query`. User-supplied text only ever
/// travels as bind parameters.
fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, query: &EventQuery) {
    qb.push(" WHERE TRUE");

    if let Some(active) = query.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(organizer) = query.organizer {
        qb.push(" AND organizer_id = ").push_bind(organizer);
    }
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(day) = &query.day {
        qb.push(" AND date >= ")
            .push_bind(day.start)
            .push(" AND date < ")
            .push_bind(day.end);
    }
    match query.price {
        PriceFilter::Any => {}
        PriceFilter::Free => {
            qb.push(" AND price = 0");
        }
        PriceFilter::Paid => {
            qb.push(" AND price > 0");
        }
    }
    if let Some(location) = &query.location {
        qb.push(" AND address ILIKE ")
            .push_bind(like_pattern(location))
            .push(" ESCAPE '\\'");
    }
}

fn order_clause(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Date => " ORDER BY date ASC, id ASC",
        SortKey::DateDesc => " ORDER BY date DESC, id ASC",
        SortKey::Price => " ORDER BY price ASC, id ASC",
        SortKey::PriceDesc => " ORDER BY price DESC, id ASC",
        SortKey::Created => " ORDER BY created_at DESC, id ASC",
    }
}

#[async_trait]
impl AbstractUsers for PgDatabase {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, saved_events, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.saved_events)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DatabaseError::Duplicate { field: "email" }
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn fetch_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn toggle_saved_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<bool>> {
        // single-row UPDATE keeps the toggle atomic per user
        let saved = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE users
            SET saved_events = CASE
                    WHEN $2 = ANY(saved_events) THEN array_remove(saved_events, $2)
                    ELSE array_append(saved_events, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING $2 = ANY(saved_events)
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn delete_account(&self, user_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let deactivated = sqlx::query(
            "UPDATE events SET is_active = FALSE, updated_at = NOW() WHERE organizer_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        info!("Account {} deleted, {} events deactivated", user_id, deactivated);
        Ok(true)
    }
}

#[async_trait]
impl AbstractEvents for PgDatabase {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        let coordinates = event.location.coordinates;
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.location.address)
        .bind(coordinates.map(|c| c.lat))
        .bind(coordinates.map(|c| c.lng))
        .bind(event.category.as_str())
        .bind(&event.image)
        .bind(event.price)
        .bind(event.organizer_id)
        .bind(event.is_active)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_event(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn fetch_events(&self, ids: &[Uuid]) -> Result<Vec<Event>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        into_events(rows)
    }

    async fn find_events(
        &self,
        query: &EventQuery,
        window: PageRequest,
    ) -> Result<(Vec<Event>, u64)> {
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events"));
        push_conditions(&mut select, query);
        select
            .push(order_clause(query.sort))
            .push(" LIMIT ")
            .push_bind(window.limit() as i64)
            .push(" OFFSET ")
            .push_bind(window.skip() as i64);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events");
        push_conditions(&mut count, query);

        // page and total count in parallel
        let (rows, total) = futures::try_join!(
            select.build_query_as::<EventRow>().fetch_all(&self.pool),
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        Ok((into_events(rows)?, total.max(0) as u64))
    }

    async fn count_events(&self, query: &EventQuery) -> Result<u64> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events");
        push_conditions(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    async fn update_event(&self, id: Uuid, changes: &EventChanges) -> Result<Option<Event>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE events SET updated_at = NOW()");

        if let Some(title) = &changes.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &changes.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(date) = changes.date {
            qb.push(", date = ").push_bind(date);
        }
        if let Some(time) = &changes.time {
            qb.push(", time = ").push_bind(time.clone());
        }
        if let Some(location) = &changes.location {
            qb.push(", address = ")
                .push_bind(location.address.clone())
                .push(", latitude = ")
                .push_bind(location.coordinates.map(|c| c.lat))
                .push(", longitude = ")
                .push_bind(location.coordinates.map(|c| c.lng));
        }
        if let Some(category) = changes.category {
            qb.push(", category = ").push_bind(category.as_str());
        }
        if let Some(image) = &changes.image {
            qb.push(", image = ").push_bind(image.clone());
        }
        if let Some(price) = changes.price {
            qb.push(", price = ").push_bind(price);
        }
        if let Some(is_active) = changes.is_active {
            qb.push(", is_active = ").push_bind(is_active);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {EVENT_COLUMNS}"));

        let row = qb
            .build_query_as::<EventRow>()
            .fetch_optional(&self.pool)
            .await?;
        row.map(Event::try_from).transpose()
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::EventFilters;

    #[test]
    fn conditions_bind_user_text() {
        let filters = EventFilters::from_query_string(
            "category=Music&search=jazz'--&price=paid&location=Leeds&date=2030-01-02",
        )
        .unwrap();
        let query = EventQuery::public(&filters).unwrap();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events");
        push_conditions(&mut qb, &query);
        let sql = qb.sql();

        assert!(sql.contains("is_active = $1"));
        assert!(sql.contains("category = $2"));
        assert!(sql.contains("title ILIKE $3 ESCAPE '\\' OR description ILIKE $4"));
        assert!(sql.contains("date >= $5 AND date < $6"));
        assert!(sql.contains("price > 0"));
        assert!(sql.contains("address ILIKE $7"));
        assert!(!sql.contains("jazz"));
    }

    #[test]
    fn empty_public_query_only_filters_active() {
        let query = EventQuery::public(&EventFilters::default()).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events");
        push_conditions(&mut qb, &query);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM events WHERE TRUE AND is_active = $1");
    }

    #[test]
    fn every_sort_key_has_a_stable_tiebreak() {
        for key in [SortKey::Date, SortKey::DateDesc, SortKey::Price, SortKey::PriceDesc, SortKey::Created] {
            assert!(order_clause(key).ends_with(", id ASC"));
        }
    }
}
