mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use serde_json::json;

use franchise_comms_api::database::Profile;

use common::*;

#[tokio::test]
async fn anonymous_caller_is_unauthorized() {
    let res = send(
        router(Arc::new(default_auth()), Arc::new(FakeStore::default())),
        get("/api/auth/me", None),
    )
    .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Unauthorized");
    assert!(res.body["message"].is_string());
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let res = send(
        router(Arc::new(default_auth()), Arc::new(FakeStore::default())),
        get("/api/auth/me", Some("forged")),
    )
    .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn returns_exactly_the_profile_row() {
    let created_at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let store = Arc::new(FakeStore::default());
    store.tables.lock().unwrap().profiles.insert(
        ALICE_ID.to_string(),
        Profile {
            id: ALICE_ID.to_string(),
            email: Some("alice@example.com".into()),
            name: Some("Alice".into()),
            avatar_url: None,
            created_at: Some(created_at),
            updated_at: None,
        },
    );

    let res = send(router(Arc::new(default_auth()), store), get("/api/auth/me", Some(ALICE_TOKEN))).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({
            "id": ALICE_ID,
            "email": "alice@example.com",
            "name": "Alice",
            "avatar_url": null,
            "created_at": "2025-01-02T03:04:05Z",
        })
    );
}

#[tokio::test]
async fn falls_back_to_the_auth_record() {
    let mut alice = user(ALICE_ID, "alice@example.com");
    alice.user_metadata = json!({"name": "Alice A.", "avatar_url": "https://cdn.example.com/a.png"});
    let auth = FakeAuth::default().with_user(ALICE_TOKEN, alice);

    let res = send(
        router(Arc::new(auth), Arc::new(FakeStore::default())),
        get("/api/auth/me", Some(ALICE_TOKEN)),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["id"], ALICE_ID);
    assert_eq!(res.body["name"], "Alice A.");
    assert_eq!(res.body["avatar_url"], "https://cdn.example.com/a.png");
}
