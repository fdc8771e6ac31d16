use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::cache::CacheService;
use crate::error::{ApiError, ApiResult};
use crate::models::{Event, EventView, OrganizerSummary, User};
use crate::query::{EventFilters, EventQuery, Page, PageRequest, Pagination};
use crate::validation::{CreateEventRequest, UpdateEventRequest};
use crate::AppState;

/// Unparseable ids read as missing events.
pub fn parse_event_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::event_not_found())
}

fn saved_by(viewer: Option<&User>) -> &[Uuid] {
    viewer.map(|u| u.saved_events.as_slice()).unwrap_or(&[])
}

pub struct EventService<'a> {
    state: &'a AppState,
}

impl<'a> EventService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Attaches organizer summaries; `with_email` for single-event reads.
    pub(crate) async fn populate(&self, events: Vec<Event>, with_email: bool) -> ApiResult<Vec<EventView>> {
        let mut organizer_ids: Vec<Uuid> = events.iter().map(|e| e.organizer_id).collect();
        organizer_ids.sort_unstable();
        organizer_ids.dedup();

        let organizers: HashMap<Uuid, OrganizerSummary> = self
            .state
            .db
            .fetch_users(&organizer_ids)
            .await?
            .into_iter()
            .map(|u| {
                let summary = OrganizerSummary {
                    id: u.id,
                    name: u.name,
                    email: with_email.then_some(u.email),
                };
                (u.id, summary)
            })
            .collect();

        Ok(events
            .into_iter()
            .map(|event| {
                let organizer = organizers.get(&event.organizer_id).cloned();
                EventView::new(event, organizer)
            })
            .collect())
    }

    /// Fetches an event for mutation by `caller`: missing → not found,
    /// someone else's → forbidden.
    async fn owned_event(&self, id: Uuid, caller: &User, action: &str) -> ApiResult<Event> {
        let event = self
            .state
            .db
            .fetch_event(id)
            .await?
            .ok_or_else(ApiError::event_not_found)?;

        if event.organizer_id != caller.id {
            return Err(ApiError::Forbidden(format!("Not authorized to {action} this event")));
        }
        Ok(event)
    }

    pub async fn list(
        &self,
        filters: &EventFilters,
        page: Option<u32>,
        limit: Option<u32>,
        viewer: Option<&User>,
    ) -> ApiResult<Page<EventView>> {
        let query = EventQuery::public(filters).map_err(ApiError::Validation)?;
        let window = PageRequest::new(page, limit, self.state.config.pagination.default_limit);
        let key = CacheService::listing_key(&query, window);

        let page = match self.state.cache.get_listing(&key).await {
            Some(cached) => cached,
            None => {
                let (events, total_count) = self.state.db.find_events(&query, window).await?;
                let page = Page {
                    events: self.populate(events, false).await?,
                    pagination: Pagination::new(window, total_count),
                };
                self.state.cache.put_listing(&key, &page).await;
                page
            }
        };

        let saved = saved_by(viewer);
        Ok(page.map(|event| event.with_saved(saved)))
    }

    /// Inactive events are indistinguishable from missing ones.
    pub async fn get(&self, id: &str, viewer: Option<&User>) -> ApiResult<EventView> {
        let id = parse_event_id(id)?;
        let event = self
            .state
            .db
            .fetch_event(id)
            .await?
            .filter(|e| e.is_active)
            .ok_or_else(ApiError::event_not_found)?;

        let view = self
            .populate(vec![event], true)
            .await?
            .pop()
            .ok_or_else(ApiError::event_not_found)?;
        Ok(view.with_saved(saved_by(viewer)))
    }

    pub async fn create(&self, request: CreateEventRequest, organizer: &User) -> ApiResult<EventView> {
        let data = request.into_new_event()?;
        let event = Event::create(data, organizer.id);
        self.state.db.insert_event(&event).await?;
        self.state.cache.invalidate_listings().await;

        info!("Event {} created by {}", event.id, organizer.id);
        let view = EventView::new(
            event,
            Some(OrganizerSummary {
                id: organizer.id,
                name: organizer.name.clone(),
                email: None,
            }),
        );
        Ok(view.with_saved(&organizer.saved_events))
    }

    pub async fn update(&self, id: &str, request: UpdateEventRequest, caller: &User) -> ApiResult<EventView> {
        let changes = request.into_changes()?;
        let id = parse_event_id(id)?;
        let current = self.owned_event(id, caller, "update").await?;

        let updated = if changes.is_empty() {
            current
        } else {
            let updated = self
                .state
                .db
                .update_event(id, &changes)
                .await?
                .ok_or_else(ApiError::event_not_found)?;
            self.state.cache.invalidate_listings().await;
            info!("Event {} updated by {}", id, caller.id);
            updated
        };

        let view = self
            .populate(vec![updated], false)
            .await?
            .pop()
            .ok_or_else(ApiError::event_not_found)?;
        Ok(view.with_saved(&caller.saved_events))
    }

    /// Hard delete; saved-list references elsewhere are left dangling and
    /// dropped on read.
    pub async fn delete(&self, id: &str, caller: &User) -> ApiResult<()> {
        let id = parse_event_id(id)?;
        self.owned_event(id, caller, "delete").await?;

        if !self.state.db.delete_event(id).await? {
            return Err(ApiError::event_not_found());
        }
        self.state.cache.invalidate_listings().await;
        info!("Event {} deleted by {}", id, caller.id);
        Ok(())
    }

    /// Flips membership of the event in the caller's saved list and returns
    /// the new state. Repeating the call alternates the result.
    pub async fn toggle_save(&self, id: &str, caller: &User) -> ApiResult<bool> {
        let id = parse_event_id(id)?;
        self.state
            .db
            .fetch_event(id)
            .await?
            .filter(|e| e.is_active)
            .ok_or_else(ApiError::event_not_found)?;

        self.state
            .db
            .toggle_saved_event(caller.id, id)
            .await?
            .ok_or_else(ApiError::unauthenticated)
    }

    /// Caller's saved events that are still active, in save order.
    pub async fn saved(&self, caller: &User) -> ApiResult<Vec<EventView>> {
        let mut by_id: HashMap<Uuid, Event> = self
            .state
            .db
            .fetch_events(&caller.saved_events)
            .await?
            .into_iter()
            .filter(|e| e.is_active)
            .map(|e| (e.id, e))
            .collect();

        let ordered: Vec<Event> = caller
            .saved_events
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        Ok(self
            .populate(ordered, false)
            .await?
            .into_iter()
            .map(|view| view.with_saved(&caller.saved_events))
            .collect())
    }
}
