// ABOUTME: Integration tests for the token manager and OAuth flow plumbing
// ABOUTME: Covers state classification, client construction, and CSRF state handling

mod common;

use chrono::{Duration, Utc};
use common::{create_test_database, create_test_user, test_user};
use std::sync::Arc;
use stride::errors::ErrorCode;
use stride::oauth::manager::TokenManager;
use stride::oauth::TokenState;

fn manager(db: &common::TestDatabase) -> TokenManager {
    TokenManager::new(
        Arc::clone(&db.database),
        "client-id".to_owned(),
        "client-secret".to_owned(),
        "http://localhost:8080/api/oauth/callback".to_owned(),
    )
}

#[tokio::test]
async fn valid_token_yields_a_client_without_refresh() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let manager = manager(&db);

    // The stored token expires in six hours; no refresh path is taken
    let client = manager.authorized_client(user.id).await;
    assert!(client.is_ok());
}

#[tokio::test]
async fn missing_credentials_surface_as_auth_failure() {
    let db = create_test_database().await;
    let mut user = test_user();
    user.strava_token = None;
    db.database.create_user(&user).await.unwrap();

    let manager = manager(&db);
    let err = manager
        .authorized_client(user.id)
        .await
        .expect_err("no credentials");
    assert_eq!(err.code, ErrorCode::AuthFailed);
}

#[tokio::test]
async fn unknown_athlete_is_not_found() {
    let db = create_test_database().await;
    let manager = manager(&db);

    let err = manager
        .authorized_client(uuid::Uuid::new_v4())
        .await
        .expect_err("unknown user");
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn token_status_reports_lifecycle_states() {
    let db = create_test_database().await;
    let manager = manager(&db);

    // Valid
    let valid_user = create_test_user(&db.database).await;
    let status = manager.token_status(valid_user.id).await.unwrap();
    assert_eq!(status.state, TokenState::Valid);
    assert!(status.expires_in_hours.unwrap() > 5.0);

    // Expiring soon
    let mut expiring = test_user();
    if let Some(token) = expiring.strava_token.as_mut() {
        token.expires_at = Utc::now() + Duration::minutes(10);
    }
    db.database.create_user(&expiring).await.unwrap();
    db.database
        .update_strava_token(
            expiring.id,
            "access",
            "refresh",
            Utc::now() + Duration::minutes(10),
            None,
        )
        .await
        .unwrap();
    let status = manager.token_status(expiring.id).await.unwrap();
    assert_eq!(status.state, TokenState::ExpiringSoon);

    // Expired
    let expired = test_user();
    db.database.create_user(&expired).await.unwrap();
    db.database
        .update_strava_token(
            expired.id,
            "access",
            "refresh",
            Utc::now() - Duration::hours(1),
            None,
        )
        .await
        .unwrap();
    let status = manager.token_status(expired.id).await.unwrap();
    assert_eq!(status.state, TokenState::Expired);

    // Missing
    let mut missing = test_user();
    missing.strava_token = None;
    db.database.create_user(&missing).await.unwrap();
    let status = manager.token_status(missing.id).await.unwrap();
    assert_eq!(status.state, TokenState::Missing);
    assert!(status.recommendation.contains("re-authorization"));
}

#[tokio::test]
async fn auth_url_carries_csrf_state_for_the_athlete() {
    let db = create_test_database().await;
    let user = create_test_user(&db.database).await;
    let manager = manager(&db);

    let response = manager.generate_auth_url(user.id).await.unwrap();

    assert!(response.authorization_url.contains("client_id=client-id"));
    assert!(response.state.starts_with(&user.id.to_string()));
    assert_eq!(response.provider, "strava");
    assert_eq!(response.expires_in_minutes, 10);
}

#[tokio::test]
async fn auth_url_for_unknown_athlete_is_rejected() {
    let db = create_test_database().await;
    let manager = manager(&db);

    let err = manager
        .generate_auth_url(uuid::Uuid::new_v4())
        .await
        .expect_err("unknown user");
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn callback_with_unknown_state_is_rejected() {
    let db = create_test_database().await;
    let manager = manager(&db);

    let err = manager
        .handle_callback("some-code", "forged-state")
        .await
        .expect_err("unknown state");
    assert_eq!(err.code, ErrorCode::InvalidInput);
}
