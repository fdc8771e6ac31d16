mod common;

use common::TestHarness;
use eventhub::client::{ApiClient, AuthStore, EventStore, SessionStorage};
use eventhub::models::Category;
use eventhub::query::EventFilters;
use eventhub::validation::{CreateEventRequest, LocationInput, LoginRequest, RegisterRequest, UpdateEventRequest};

fn concert(title: &str, price: f64) -> CreateEventRequest {
    CreateEventRequest {
        title: Some(title.to_string()),
        description: Some("Live music in the park for everyone".to_string()),
        date: Some(common::tomorrow()),
        time: Some("19:30".to_string()),
        location: LocationInput {
            address: Some("Central Park".to_string()),
            coordinates: None,
        },
        category: Some("Music".to_string()),
        image: Some("https://example.com/concert.png".to_string()),
        price: Some(price),
    }
}

#[tokio::test]
async fn store_stays_consistent_with_the_server() {
    let h = TestHarness::new().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = SessionStorage::new(dir.path().join("store.json"));

    let client = ApiClient::new(h.api_base()).unwrap().with_session(storage.clone());
    let auth = AuthStore::new(client.clone());
    let events = EventStore::new(client.clone());

    auth.register(&RegisterRequest {
        name: Some("Ada Lovelace".into()),
        email: Some("ada@example.com".into()),
        password: Some("Secret123".into()),
    })
    .await
    .unwrap();
    assert!(storage.load().is_some());

    let free = events.create_event(&concert("Free concert", 0.0)).await.unwrap();
    let paid = events.create_event(&concert("Paid concert", 20.0)).await.unwrap();
    assert!(auth.is_event_organizer(&free));
    assert_eq!(events.snapshot().dashboard_stats.map(|s| s.total_events), Some(2));

    events
        .set_filters(EventFilters {
            price: Some("free".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let state = events.snapshot();
    assert_eq!(state.events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![free.id]);
    assert_eq!(state.pagination.total_count, 1);

    events.clear_filters().await.unwrap();
    assert_eq!(events.snapshot().events.len(), 2);
    assert_eq!(events.events_by_category(Category::Music).len(), 2);

    events.fetch_event(&paid.id.to_string()).await.unwrap();
    assert!(events.toggle_save(&paid.id.to_string()).await.unwrap());

    let state = events.snapshot();
    assert!(state.current_event.as_ref().unwrap().is_saved);
    assert!(state.events.iter().find(|e| e.id == paid.id).unwrap().is_saved);
    assert!(!state.events.iter().find(|e| e.id == free.id).unwrap().is_saved);
    assert_eq!(state.saved_events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![paid.id]);
    assert_eq!(state.dashboard_stats.map(|s| s.saved_events), Some(1));

    let updated = events
        .update_event(
            &paid.id.to_string(),
            &UpdateEventRequest {
                title: Some("Paid concert, moved".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(events.snapshot().current_event.unwrap().title, updated.title);

    events.delete_event(&free.id.to_string()).await.unwrap();
    let state = events.snapshot();
    assert!(state.events.iter().all(|e| e.id != free.id));
    assert_eq!(state.dashboard_stats.map(|s| s.total_events), Some(1));

    auth.logout();
    assert!(storage.load().is_none());
    assert!(events.fetch_saved_events().await.unwrap_err().is_auth_failure());

    auth.login(&LoginRequest {
        email: Some("ada@example.com".into()),
        password: Some("Secret123".into()),
    })
    .await
    .unwrap();
    events.fetch_my_events(None).await.unwrap();
    assert_eq!(events.snapshot().my_events.len(), 1);
}

#[tokio::test]
async fn forbidden_update_surfaces_without_touching_state() {
    let h = TestHarness::new().await;
    let owner = h.new_user().await;
    let id = h.create_event(&owner, serde_json::json!({})).await;

    let intruder = h.new_user().await;
    let client = ApiClient::new(h.api_base()).unwrap();
    client.set_token(Some(intruder.token.clone()));
    let events = EventStore::new(client);

    events.fetch_event(&id).await.unwrap();
    let err = events
        .update_event(
            &id,
            &UpdateEventRequest {
                title: Some("Not yours".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(reqwest::StatusCode::FORBIDDEN));
    let state = events.snapshot();
    assert_eq!(state.current_event.unwrap().title, "Open air concert");
    assert_eq!(state.error.as_deref(), Some("Not authorized to update this event"));
}
