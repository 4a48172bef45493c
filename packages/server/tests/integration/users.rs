use std::time::Duration;

use depot::catalog::CatalogError;
use depot::entity::user;
use sea_orm::{IntoActiveModel, Set};
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn deleting_user_orphans_uploads_and_removes_urls_and_tokens() {
    let app = TestApp::spawn().await;
    let (user_id, token) = app.create_user("alice").await;
    let (_, other) = app.create_user("bob").await;

    let upload = app.upload("kept.txt", b"outlives its owner", &token).await;
    let reference = upload["reference"].as_str().unwrap();
    let created = app
        .shorten(&json!({ "url": "https://example.com", "custom_code": "owned" }), &token)
        .await;
    let url_id = created["id"].as_i64().unwrap() as i32;
    let theirs = app
        .shorten(&json!({ "url": "https://example.org", "custom_code": "theirs" }), &other)
        .await;

    assert_eq!(app.get(&routes::short("owned")).await.status, 307);
    for _ in 0..50 {
        if app.catalog().url_analytics(url_id).await.unwrap().total_clicks == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(app.catalog().url_analytics(url_id).await.unwrap().total_clicks, 1);

    assert!(app.catalog().delete_user(user_id).await.unwrap());

    let item = app
        .catalog()
        .item_by_reference(reference)
        .await
        .unwrap()
        .expect("upload survives its owner");
    assert_eq!(item.owner_id, None);
    assert!(app.store.exists(&item.blob_key).await.unwrap());
    assert_eq!(app.get(&routes::file(reference)).await.status, 200);

    assert!(app.catalog().url_by_id(url_id).await.unwrap().is_none());
    assert_eq!(app.catalog().url_analytics(url_id).await.unwrap().total_clicks, 0);
    assert_eq!(app.get(&routes::short("owned")).await.status, 404);
    assert!(app.catalog().tokens_by_owner(user_id).await.unwrap().is_empty());
    assert_eq!(app.get_with_token(routes::STATS, &token).await.status, 401);

    // Other accounts are untouched.
    let their_id = theirs["id"].as_i64().unwrap() as i32;
    assert!(app.catalog().url_by_id(their_id).await.unwrap().is_some());
    assert_eq!(app.get_with_token(routes::STATS, &other).await.status, 200);

    assert!(!app.catalog().delete_user(user_id).await.unwrap());
}

#[tokio::test]
async fn user_is_found_by_email_after_update() {
    let app = TestApp::spawn().await;
    let (user_id, _) = app.create_user("carol").await;
    app.create_user("dave").await;

    let found = app
        .catalog()
        .user_by_email("carol@depot.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user_id);

    let mut changed = found.clone().into_active_model();
    changed.email = Set("carol@example.com".to_string());
    let updated = app.catalog().update_user(changed).await.unwrap();
    assert_eq!(updated.email, "carol@example.com");
    assert!(updated.updated_at >= found.updated_at);
    assert!(
        app.catalog()
            .user_by_email("carol@depot.test")
            .await
            .unwrap()
            .is_none()
    );

    let mut clash = updated.into_active_model();
    clash.email = Set("dave@depot.test".to_string());
    assert!(matches!(
        app.catalog().update_user(clash).await,
        Err(CatalogError::Duplicate(_))
    ));

    let missing = user::ActiveModel {
        id: Set(user_id + 100),
        email: Set("ghost@depot.test".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        app.catalog().update_user(missing).await,
        Err(CatalogError::NotFound)
    ));
}
