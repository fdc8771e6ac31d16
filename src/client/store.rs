//! Client-side event store. All state lives in one [`EventState`] value
//! behind a `watch` channel, so readers always observe a whole snapshot.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};
use crate::models::{Category, DashboardStats, EventView};
use crate::query::{EventFilters, Pagination};
use crate::validation::{CreateEventRequest, UpdateEventRequest};

const UPCOMING_LIMIT: usize = 6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventState {
    pub events: Vec<EventView>,
    pub pagination: Pagination,
    pub filters: EventFilters,
    pub current_event: Option<EventView>,
    pub saved_events: Vec<EventView>,
    pub my_events: Vec<EventView>,
    pub my_events_pagination: Pagination,
    pub dashboard_stats: Option<DashboardStats>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl EventState {
    pub fn events_by_category(&self, category: Category) -> Vec<EventView> {
        self.events
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    /// At most six listed events strictly after `now`, soonest first.
    pub fn upcoming_events(&self, now: DateTime<Utc>) -> Vec<EventView> {
        let mut upcoming: Vec<EventView> = self
            .events
            .iter()
            .filter(|e| e.date > now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|e| e.date);
        upcoming.truncate(UPCOMING_LIMIT);
        upcoming
    }

    /// Case-insensitive substring match over the loaded page only: title,
    /// description, category and address.
    pub fn search_events(&self, query: &str) -> Vec<EventView> {
        let needle = query.to_lowercase();
        self.events
            .iter()
            .filter(|e| {
                [e.title.as_str(), e.description.as_str(), e.category.as_str(), e.location.address.as_str()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    fn patch_saved(&mut self, id: Uuid, is_saved: bool) {
        if let Some(event) = self.events.iter_mut().find(|e| e.id == id) {
            event.is_saved = is_saved;
        }
        if let Some(current) = self.current_event.as_mut().filter(|e| e.id == id) {
            current.is_saved = is_saved;
        }
    }

    fn replace_event(&mut self, updated: &EventView) {
        for list in [&mut self.events, &mut self.my_events, &mut self.saved_events] {
            if let Some(slot) = list.iter_mut().find(|e| e.id == updated.id) {
                *slot = updated.clone();
            }
        }
        if let Some(current) = self.current_event.as_mut().filter(|e| e.id == updated.id) {
            *current = updated.clone();
        }
    }

    fn remove_event(&mut self, id: Uuid) {
        self.events.retain(|e| e.id != id);
        self.my_events.retain(|e| e.id != id);
        self.saved_events.retain(|e| e.id != id);
        if self.current_event.as_ref().is_some_and(|e| e.id == id) {
            self.current_event = None;
        }
    }
}

pub struct EventStore {
    client: ApiClient,
    state: watch::Sender<EventState>,
}

impl EventStore {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(EventState::default());
        Self { client, state }
    }

    pub fn snapshot(&self) -> EventState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EventState> {
        self.state.subscribe()
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn finish<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.state.send_modify(|s| s.is_loading = false);
                Ok(value)
            }
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Overlays `filters` and refetches page 1. The visible list changes
    /// only when the fetch lands.
    pub async fn set_filters(&self, filters: EventFilters) -> Result<(), ClientError> {
        self.state.send_modify(|s| s.filters.merge(filters));
        self.fetch_events(Some(1)).await
    }

    pub async fn clear_filters(&self) -> Result<(), ClientError> {
        self.state.send_modify(|s| s.filters = EventFilters::default());
        self.fetch_events(Some(1)).await
    }

    pub async fn fetch_events(&self, page: Option<u32>) -> Result<(), ClientError> {
        let filters = self.state.borrow().filters.clone();
        self.begin();
        let result = self.client.list_events(&filters, page, None).await;
        let result = result.map(|data| {
            self.state.send_modify(|s| {
                s.events = data.events;
                s.pagination = data.pagination.unwrap_or_default();
            });
        });
        self.finish(result)
    }

    pub async fn fetch_event(&self, id: &str) -> Result<EventView, ClientError> {
        self.begin();
        let result = self.client.get_event(id).await.map(|data| {
            self.state.send_modify(|s| s.current_event = Some(data.event.clone()));
            data.event
        });
        if result.is_err() {
            self.state.send_modify(|s| s.current_event = None);
        }
        self.finish(result)
    }

    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<EventView, ClientError> {
        self.begin();
        let result = self.client.create_event(request).await.map(|data| {
            self.state.send_modify(|s| s.events.insert(0, data.event.clone()));
            data.event
        });
        let event = self.finish(result)?;
        self.refresh_stats().await;
        Ok(event)
    }

    pub async fn update_event(&self, id: &str, request: &UpdateEventRequest) -> Result<EventView, ClientError> {
        self.begin();
        let result = self.client.update_event(id, request).await.map(|data| {
            self.state.send_modify(|s| s.replace_event(&data.event));
            data.event
        });
        self.finish(result)
    }

    pub async fn delete_event(&self, id: &str) -> Result<(), ClientError> {
        self.begin();
        let result = self.client.delete_event(id).await.map(|()| {
            if let Ok(id) = Uuid::parse_str(id) {
                self.state.send_modify(|s| s.remove_event(id));
            }
        });
        self.finish(result)?;
        self.refresh_stats().await;
        Ok(())
    }

    /// Flips the per-event flag locally, then reloads the saved list and the
    /// stats from the server instead of patching them.
    pub async fn toggle_save(&self, id: &str) -> Result<bool, ClientError> {
        let is_saved = match self.client.toggle_save(id).await {
            Ok(data) => data.is_saved,
            Err(e) => return self.finish(Err(e)),
        };
        if let Ok(id) = Uuid::parse_str(id) {
            self.state.send_modify(|s| s.patch_saved(id, is_saved));
        }

        let (saved, stats) = tokio::join!(self.fetch_saved_events(), self.fetch_dashboard_stats());
        if let Err(e) = saved.and(stats) {
            warn!("post-toggle refresh failed: {}", e);
        }
        Ok(is_saved)
    }

    pub async fn fetch_saved_events(&self) -> Result<(), ClientError> {
        let result = self.client.saved_events().await.map(|data| {
            self.state.send_modify(|s| s.saved_events = data.events);
        });
        self.finish(result)
    }

    pub async fn fetch_my_events(&self, page: Option<u32>) -> Result<(), ClientError> {
        self.begin();
        let result = self.client.my_events(page, None).await.map(|data| {
            self.state.send_modify(|s| {
                s.my_events = data.events;
                s.my_events_pagination = data.pagination.unwrap_or_default();
            });
        });
        self.finish(result)
    }

    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        let result = self.client.dashboard().await.map(|data| {
            self.state.send_modify(|s| s.dashboard_stats = Some(data.stats));
            data.stats
        });
        self.finish(result)
    }

    async fn refresh_stats(&self) {
        if let Err(e) = self.fetch_dashboard_stats().await {
            warn!("stats refresh failed: {}", e);
        }
    }

    pub fn events_by_category(&self, category: Category) -> Vec<EventView> {
        self.state.borrow().events_by_category(category)
    }

    pub fn upcoming_events(&self) -> Vec<EventView> {
        self.state.borrow().upcoming_events(Utc::now())
    }

    pub fn search_events(&self, query: &str) -> Vec<EventView> {
        self.state.borrow().search_events(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EVENT_A: &str = "0b5d6a4e-0000-4000-8000-00000000000a";
    const EVENT_B: &str = "0b5d6a4e-0000-4000-8000-00000000000b";

    fn event_json(id: &str, category: &str, days_ahead: i64, is_saved: bool) -> Value {
        let date = Utc::now() + Duration::days(days_ahead);
        json!({
            "id": id,
            "title": "Jazz night",
            "description": "An evening of live jazz",
            "date": date,
            "time": "19:00",
            "location": { "address": "1 Main St" },
            "category": category,
            "image": "https://example.com/a.png",
            "price": 0.0,
            "organizer": null,
            "isActive": true,
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
            "isSaved": is_saved
        })
    }

    fn ok(data: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
    }

    async fn store_for(server: &MockServer) -> EventStore {
        EventStore::new(ApiClient::new(format!("{}/api", server.uri())).unwrap())
    }

    #[tokio::test]
    async fn toggle_patches_flags_and_refetches_aggregates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ok(json!({
                "events": [event_json(EVENT_A, "Music", 1, false), event_json(EVENT_B, "Sports", 2, false)],
                "pagination": { "currentPage": 1, "totalPages": 1, "totalCount": 2, "hasNextPage": false, "hasPrevPage": false }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{EVENT_A}")))
            .respond_with(ok(json!({ "event": event_json(EVENT_A, "Music", 1, false) })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/api/events/{EVENT_A}/save")))
            .respond_with(ok(json!({ "isSaved": true })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/events/saved"))
            .respond_with(ok(json!({ "events": [event_json(EVENT_A, "Music", 1, true)] })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users/dashboard"))
            .respond_with(ok(json!({ "stats": { "totalEvents": 0, "activeEvents": 0, "savedEvents": 1 } })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        store.fetch_events(None).await.unwrap();
        store.fetch_event(EVENT_A).await.unwrap();

        assert!(store.toggle_save(EVENT_A).await.unwrap());

        let state = store.snapshot();
        let a = state.events.iter().find(|e| e.id.to_string() == EVENT_A).unwrap();
        let b = state.events.iter().find(|e| e.id.to_string() == EVENT_B).unwrap();
        assert!(a.is_saved);
        assert!(!b.is_saved);
        assert!(state.current_event.as_ref().unwrap().is_saved);
        assert_eq!(state.saved_events.len(), 1);
        assert_eq!(state.dashboard_stats.unwrap().saved_events, 1);
    }

    #[tokio::test]
    async fn filters_drive_the_next_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("category", "Music"))
            .and(query_param("page", "1"))
            .respond_with(ok(json!({
                "events": [event_json(EVENT_A, "Music", 1, false)],
                "pagination": { "currentPage": 1, "totalPages": 1, "totalCount": 1, "hasNextPage": false, "hasPrevPage": false }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        store
            .set_filters(EventFilters {
                category: Some("Music".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let state = store.snapshot();
        assert_eq!(state.filters.category.as_deref(), Some("Music"));
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.pagination.total_count, 1);
        assert_eq!(store.events_by_category(Category::Music).len(), 1);
        assert!(store.events_by_category(Category::Sports).is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_list_and_sets_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "message": "Server error"
            })))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let err = store.fetch_events(None).await.unwrap_err();

        assert_eq!(err.to_string(), "Server error");
        let state = store.snapshot();
        assert!(state.events.is_empty());
        assert_eq!(state.error.as_deref(), Some("Server error"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn delete_drops_the_event_everywhere() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{EVENT_A}")))
            .respond_with(ok(json!({ "event": event_json(EVENT_A, "Music", 1, false) })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/api/events/{EVENT_A}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Event deleted successfully"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users/dashboard"))
            .respond_with(ok(json!({ "stats": { "totalEvents": 0, "activeEvents": 0, "savedEvents": 0 } })))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        store.fetch_event(EVENT_A).await.unwrap();
        store.delete_event(EVENT_A).await.unwrap();

        let state = store.snapshot();
        assert!(state.current_event.is_none());
        assert_eq!(state.dashboard_stats.map(|s| s.total_events), Some(0));
    }

    #[test]
    fn upcoming_skips_past_events_and_sorts() {
        let past: EventView = serde_json::from_value(event_json(EVENT_A, "Music", -1, false)).unwrap();
        let later: EventView = serde_json::from_value(event_json(EVENT_B, "Music", 5, false)).unwrap();
        let mut soon = later.clone();
        soon.id = Uuid::new_v4();
        soon.date = Utc::now() + Duration::days(1);

        let state = EventState {
            events: vec![past, later.clone(), soon.clone()],
            ..Default::default()
        };
        let upcoming = state.upcoming_events(Utc::now());
        assert_eq!(upcoming.iter().map(|e| e.id).collect::<Vec<_>>(), vec![soon.id, later.id]);
    }

    #[test]
    fn upcoming_keeps_the_six_soonest_and_excludes_now() {
        let now = Utc::now();
        let template: EventView = serde_json::from_value(event_json(EVENT_A, "Music", 1, false)).unwrap();
        let mut events: Vec<EventView> = (1..=8)
            .rev()
            .map(|days| {
                let mut e = template.clone();
                e.id = Uuid::new_v4();
                e.date = now + Duration::days(days);
                e
            })
            .collect();
        let mut starting_now = template.clone();
        starting_now.date = now;
        events.push(starting_now);

        let state = EventState {
            events,
            ..Default::default()
        };
        let upcoming = state.upcoming_events(now);
        assert_eq!(upcoming.len(), 6);
        assert!(upcoming.iter().all(|e| e.date > now));
        assert_eq!(upcoming[0].date, now + Duration::days(1));
        assert_eq!(upcoming[5].date, now + Duration::days(6));
    }

    #[test]
    fn search_matches_any_text_field_ignoring_case() {
        let jazz: EventView = serde_json::from_value(event_json(EVENT_A, "Music", 1, false)).unwrap();
        let mut match_day: EventView = serde_json::from_value(event_json(EVENT_B, "Sports", 2, false)).unwrap();
        match_day.title = "Cup final".into();
        match_day.description = "Ninety minutes".into();
        match_day.location.address = "Wembley Stadium".into();

        let state = EventState {
            events: vec![jazz.clone(), match_day.clone()],
            ..Default::default()
        };
        let ids = |query: &str| state.search_events(query).iter().map(|e| e.id).collect::<Vec<_>>();

        assert_eq!(ids("JAZZ"), vec![jazz.id]);
        assert_eq!(ids("live"), vec![jazz.id]);
        assert_eq!(ids("sports"), vec![match_day.id]);
        assert_eq!(ids("wembley"), vec![match_day.id]);
        assert!(ids("opera").is_empty());
        assert_eq!(ids("").len(), 2);
    }
}
