use std::time::Duration;

use chrono::Utc;
use depot::config::{UploadConfig, WorkerConfig};
use serde_json::json;

use crate::common::{TestApp, routes};

fn no_grace() -> WorkerConfig {
    WorkerConfig {
        reconcile_grace_secs: 0,
        ..Default::default()
    }
}

#[tokio::test]
async fn cleanup_removes_expired_uploads() {
    let app = TestApp::spawn_with_upload(UploadConfig {
        expires_in: Duration::from_secs(1),
        ..Default::default()
    })
    .await;
    let (_, token) = app.create_user("alice").await;
    let body = app.upload("brief.txt", b"short lived", &token).await;
    let reference = body["reference"].as_str().unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let report = app.worker().cleanup().await.unwrap();

    assert_eq!(report.items_deleted, 1);
    assert_eq!(report.items_failed, 0);
    assert!(app.blob_keys().await.is_empty());
    assert!(
        app.catalog()
            .item_by_reference(reference)
            .await
            .unwrap()
            .is_none()
    );
    let res = app.get(&routes::file(reference)).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn cleanup_keeps_live_uploads() {
    let app = TestApp::spawn().await;
    let (_, token) = app.create_user("bob").await;
    app.upload("keep.txt", b"keep me", &token).await;

    let report = app.worker().cleanup().await.unwrap();

    assert_eq!(report.items_deleted, 0);
    assert_eq!(app.blob_keys().await.len(), 1);
}

#[tokio::test]
async fn cleanup_deactivates_overdue_urls() {
    let app = TestApp::spawn().await;
    let (_, token) = app.create_user("carol").await;
    app.shorten(
        &json!({
            "url": "https://example.com",
            "custom_code": "fleeting",
            "expires_at": Utc::now() + chrono::Duration::seconds(1),
        }),
        &token,
    )
    .await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let report = app.worker().cleanup().await.unwrap();

    assert_eq!(report.urls_expired, 1);
    let listed = app.get_with_token(routes::URLS, &token).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn reconcile_heals_both_directions() {
    let app = TestApp::spawn_with(UploadConfig::default(), no_grace()).await;
    let (_, token) = app.create_user("dave").await;

    let kept = app.upload("kept.txt", b"kept", &token).await;
    let lost = app.upload("lost.txt", b"lost", &token).await;
    let lost_item = app
        .catalog()
        .item_by_reference(lost["reference"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    app.store.delete(&lost_item.blob_key).await.unwrap();
    app.store.put("stray-orphan.bin", b"nobody owns me").await.unwrap();

    let report = app.worker().reconcile().await.unwrap();

    assert_eq!(report.orphan_blobs_deleted, 1);
    assert_eq!(report.orphan_rows_deleted, 1);
    assert_eq!(report.failures, 0);

    let kept_item = app
        .catalog()
        .item_by_reference(kept["reference"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.blob_keys().await, vec![kept_item.blob_key]);
    assert!(app.catalog().item_by_id(lost_item.id).await.unwrap().is_none());

    let again = app.worker().reconcile().await.unwrap();
    assert_eq!(again.orphan_blobs_deleted, 0);
    assert_eq!(again.orphan_rows_deleted, 0);
}

#[tokio::test]
async fn reconcile_spares_recent_orphans() {
    let app = TestApp::spawn().await;
    app.store.put("fresh-orphan.bin", b"just written").await.unwrap();

    let report = app.worker().reconcile().await.unwrap();

    assert_eq!(report.orphan_blobs_deleted, 0);
    assert_eq!(report.skipped_recent, 1);
    assert_eq!(app.blob_keys().await, vec!["fresh-orphan.bin".to_string()]);
}
