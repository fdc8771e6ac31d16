mod common;

use common::{ids, TestHarness};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn register_login_and_me() {
    let h = TestHarness::new().await;
    let user = h.new_user().await;

    let (status, body) = h
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": user.email.to_uppercase(), "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = h.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], json!(user.email));
}

#[tokio::test]
async fn wrong_password_is_unauthenticated() {
    let h = TestHarness::new().await;
    let user = h.new_user().await;

    let (status, body) = h
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": user.email, "password": "Wrong1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let h = TestHarness::new().await;
    let user = h.new_user().await;

    let (status, body) = h
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Someone", "email": user.email, "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "email");
}

#[tokio::test]
async fn weak_password_fails_validation() {
    let h = TestHarness::new().await;
    let (status, body) = h
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Someone", "email": "someone@example.com", "password": "password" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "password");
}

#[tokio::test]
async fn profile_update_through_both_routes() {
    let h = TestHarness::new().await;
    let user = h.new_user().await;

    let (status, body) = h
        .call(Method::PUT, "/api/users/profile", Some(&user.token), Some(json!({ "name": "Grace Hopper" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["name"], "Grace Hopper");

    let (status, _) = h
        .call(Method::PUT, "/api/auth/profile", Some(&user.token), Some(json!({ "name": "G" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = h.call(Method::GET, "/api/users/profile", Some(&user.token), None).await;
    assert_eq!(body["data"]["user"]["name"], "Grace Hopper");
}

#[tokio::test]
async fn rename_shows_up_in_listings() {
    let h = TestHarness::new().await;
    let user = h.new_user().await;
    let id = h.create_event(&user, json!({})).await;

    // warm the listing before the rename
    let (_, body) = h.call(Method::GET, "/api/events", None, None).await;
    assert_eq!(ids(&body), vec![id.clone()]);

    let (status, _) = h
        .call(Method::PUT, "/api/users/profile", Some(&user.token), Some(json!({ "name": "Grace Hopper" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = h.call(Method::GET, "/api/events", None, None).await;
    assert_eq!(body["data"]["events"][0]["organizer"]["name"], "Grace Hopper");
    let (_, body) = h.call(Method::GET, &format!("/api/events/{id}"), None, None).await;
    assert_eq!(body["data"]["event"]["organizer"]["name"], "Grace Hopper");
}

#[tokio::test]
async fn dashboard_counts_own_and_saved_events() {
    let h = TestHarness::new().await;
    let owner = h.new_user().await;
    let first = h.create_event(&owner, json!({})).await;
    let second = h.create_event(&owner, json!({ "title": "Second gig" })).await;

    h.call(Method::PUT, &format!("/api/events/{second}"), Some(&owner.token), Some(json!({ "isActive": false })))
        .await;
    h.call(Method::POST, &format!("/api/events/{first}/save"), Some(&owner.token), None)
        .await;

    let (status, body) = h.call(Method::GET, "/api/users/dashboard", Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["stats"],
        json!({ "totalEvents": 2, "activeEvents": 1, "savedEvents": 1 })
    );
}

#[tokio::test]
async fn my_events_includes_inactive_and_filters_by_status() {
    let h = TestHarness::new().await;
    let owner = h.new_user().await;
    let other = h.new_user().await;
    let live = h.create_event(&owner, json!({})).await;
    let paused = h.create_event(&owner, json!({ "title": "Paused gig" })).await;
    h.create_event(&other, json!({})).await;

    h.call(Method::PUT, &format!("/api/events/{paused}"), Some(&owner.token), Some(json!({ "isActive": false })))
        .await;

    let (_, body) = h.call(Method::GET, "/api/users/events", Some(&owner.token), None).await;
    let mut all = ids(&body);
    all.sort();
    let mut expected = vec![live.clone(), paused.clone()];
    expected.sort();
    assert_eq!(all, expected);
    assert_eq!(body["data"]["pagination"]["totalCount"], 2);

    let (_, body) = h
        .call(Method::GET, "/api/users/events?status=inactive", Some(&owner.token), None)
        .await;
    assert_eq!(ids(&body), vec![paused]);

    let (_, body) = h
        .call(Method::GET, "/api/users/events?status=active&page=1&limit=1", Some(&owner.token), None)
        .await;
    assert_eq!(ids(&body), vec![live]);
    assert_eq!(body["data"]["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn account_deletion_deactivates_events_and_revokes_access() {
    let h = TestHarness::new().await;
    let owner = h.new_user().await;
    let id = h.create_event(&owner, json!({})).await;

    let (status, body) = h.call(Method::DELETE, "/api/users/account", Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deleted successfully");

    // deactivated, not removed
    let stored = h.state.db.fetch_event(id.parse().unwrap()).await.unwrap();
    assert_eq!(stored.map(|e| e.is_active), Some(false));

    let (status, _) = h.call(Method::GET, &format!("/api/events/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h.call(Method::GET, "/api/auth/me", Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, token failed");
}
