use chrono::Utc;
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn issued_token_authenticates_and_is_listed() {
    let app = TestApp::spawn().await;
    let (_, token) = app.create_user("alice").await;

    let res = app
        .post_with_token(routes::TOKENS, &json!({ "name": "ci" }), &token)
        .await;
    assert_eq!(res.status, 201, "{}", res.body);
    let issued = res.body["token"].as_str().unwrap().to_string();
    assert_eq!(res.body["name"], "ci");
    assert_eq!(res.body["valid"], true);

    let stats = app.get_with_token(routes::STATS, &issued).await;
    assert_eq!(stats.status, 200);

    let list = app.get_with_token(routes::TOKENS, &issued).await;
    assert_eq!(list.status, 200);
    let tokens = list.body.as_array().unwrap();
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|t| t.get("token").is_none()));
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, token) = app.create_user("bob").await;
    let res = app
        .post_with_token(routes::TOKENS, &json!({ "name": "temp" }), &token)
        .await;
    let issued = res.body["token"].as_str().unwrap().to_string();
    let id = res.body["id"].as_i64().unwrap();

    let revoke = app.delete_with_token(&routes::token(id), &token).await;
    assert_eq!(revoke.status, 204);

    let denied = app.get_with_token(routes::STATS, &issued).await;
    assert_eq!(denied.status, 401);
    assert_eq!(denied.code(), "TOKEN_INVALID");

    let again = app.delete_with_token(&routes::token(id), &token).await;
    assert_eq!(again.status, 404);
}

#[tokio::test]
async fn cannot_revoke_someone_elses_token() {
    let app = TestApp::spawn().await;
    let (_, alice) = app.create_user("carol").await;
    let (_, bob) = app.create_user("dave").await;
    let res = app
        .post_with_token(routes::TOKENS, &json!({ "name": "mine" }), &alice)
        .await;
    let id = res.body["id"].as_i64().unwrap();

    let denied = app.delete_with_token(&routes::token(id), &bob).await;

    assert_eq!(denied.status, 404);
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, token) = app.create_user("erin").await;

    let mut tampered = token.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let res = app.get_with_token(routes::STATS, &tampered).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "TOKEN_INVALID");
}

#[tokio::test]
async fn missing_token_is_reported() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::STATS).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "TOKEN_MISSING");
}

#[tokio::test]
async fn invalid_token_requests_are_rejected() {
    let app = TestApp::spawn().await;
    let (_, token) = app.create_user("frank").await;

    let blank = app
        .post_with_token(routes::TOKENS, &json!({ "name": "  " }), &token)
        .await;
    assert_eq!(blank.status, 400);

    let past = app
        .post_with_token(
            routes::TOKENS,
            &json!({ "name": "old", "expires_at": Utc::now() - chrono::Duration::hours(1) }),
            &token,
        )
        .await;
    assert_eq!(past.status, 400);
}

#[tokio::test]
async fn token_of_deactivated_user_is_rejected() {
    let app = TestApp::spawn().await;
    let (user_id, token) = app.create_user("gina").await;

    app.catalog().set_user_active(user_id, false).await.unwrap();
    let res = app.get_with_token(routes::STATS, &token).await;

    assert_eq!(res.status, 401);
}
