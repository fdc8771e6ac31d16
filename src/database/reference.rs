use async_trait::async_trait;
use futures::lock::Mutex;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use super::{AbstractEvents, AbstractUsers, DatabaseError, Result};
use crate::models::{Event, EventChanges, User};
use crate::query::{EventQuery, PageRequest};

/// In-memory store with the same semantics as the Postgres driver.
/// Where both maps are locked, `users` is taken first.
#[derive(Clone, Default)]
pub struct ReferenceDb {
    pub users: Arc<Mutex<HashMap<Uuid, User>>>,
    pub events: Arc<Mutex<HashMap<Uuid, Event>>>,
}

#[async_trait]
impl AbstractUsers for ReferenceDb {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate { field: "email" });
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn fetch_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let users = self.users.lock().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<Option<User>> {
        let mut users = self.users.lock().await;
        Ok(users.get_mut(&id).map(|user| {
            user.name = name.to_string();
            user.updated_at = chrono::Utc::now();
            user.clone()
        }))
    }

    async fn toggle_saved_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<bool>> {
        let mut users = self.users.lock().await;
        Ok(users.get_mut(&user_id).map(|user| {
            let saved = if user.has_saved(event_id) {
                user.saved_events.retain(|id| *id != event_id);
                false
            } else {
                user.saved_events.push(event_id);
                true
            };
            user.updated_at = chrono::Utc::now();
            saved
        }))
    }

    async fn delete_account(&self, user_id: Uuid) -> Result<bool> {
        let mut users = self.users.lock().await;
        let mut events = self.events.lock().await;

        if users.remove(&user_id).is_none() {
            return Ok(false);
        }
        let now = chrono::Utc::now();
        for event in events.values_mut().filter(|e| e.organizer_id == user_id) {
            event.is_active = false;
            event.updated_at = now;
        }
        Ok(true)
    }
}

#[async_trait]
impl AbstractEvents for ReferenceDb {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.events.lock().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn fetch_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.events.lock().await.get(&id).cloned())
    }

    async fn fetch_events(&self, ids: &[Uuid]) -> Result<Vec<Event>> {
        let events = self.events.lock().await;
        Ok(ids.iter().filter_map(|id| events.get(id).cloned()).collect())
    }

    async fn find_events(
        &self,
        query: &EventQuery,
        window: PageRequest,
    ) -> Result<(Vec<Event>, u64)> {
        let events = self.events.lock().await;
        let mut matched: Vec<&Event> = events.values().filter(|e| query.matches(e)).collect();
        matched.sort_by(|a, b| query.compare(a, b));

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(window.skip() as usize)
            .take(window.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn count_events(&self, query: &EventQuery) -> Result<u64> {
        let events = self.events.lock().await;
        Ok(events.values().filter(|e| query.matches(e)).count() as u64)
    }

    async fn update_event(&self, id: Uuid, changes: &EventChanges) -> Result<Option<Event>> {
        let mut events = self.events.lock().await;
        Ok(events.get_mut(&id).map(|event| {
            event.apply(changes);
            event.clone()
        }))
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool> {
        Ok(self.events.lock().await.remove(&id).is_some())
    }
}
