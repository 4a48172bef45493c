use std::time::Duration;

use depot::config::UploadConfig;
use serde_json::Value;

use crate::common::{BASE_URL, TestApp, routes};

fn reference_of(body: &Value) -> String {
    body["reference"].as_str().unwrap().to_string()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn uuid_style_upload_round_trips() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let res = app
            .upload_with_token(
                &routes::upload_with_style("uuid"),
                "hello.txt",
                b"Hello world".to_vec(),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.body);
        let reference = reference_of(&res.body);
        assert_eq!(reference.len(), 40);
        assert!(reference.ends_with(".txt"));
        assert!(uuid::Uuid::parse_str(&reference[..36]).is_ok());
        assert_eq!(res.body["size"], 11);
        assert_eq!(res.body["original_name"], "hello.txt");
        assert_eq!(
            res.body["url"].as_str().unwrap(),
            format!("{BASE_URL}/f/{reference}")
        );

        let file = app.get(&routes::file(&reference)).await;
        assert_eq!(file.status, 200);
        assert_eq!(file.bytes, b"Hello world");
        assert!(file.header("content-type").starts_with("text/plain"));
        assert_eq!(file.header("x-content-type-options"), "nosniff");
        assert!(file.header("content-disposition").starts_with("inline"));
    }

    #[tokio::test]
    async fn upload_writes_blob_and_row() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("bob").await;

        let body = app.upload("notes.md", b"# notes\n", &token).await;

        let item = app
            .catalog()
            .item_by_reference(&reference_of(&body))
            .await
            .unwrap()
            .expect("row should exist");
        assert!(app.store.exists(&item.blob_key).await.unwrap());
        assert_eq!(app.blob_keys().await, vec![item.blob_key]);
    }

    #[tokio::test]
    async fn uploads_get_distinct_references_and_keys() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("carol").await;

        let mut references = Vec::new();
        for i in 0..5 {
            let body = app.upload("same.txt", format!("body {i}").as_bytes(), &token).await;
            references.push(reference_of(&body));
        }
        references.sort();
        references.dedup();

        assert_eq!(references.len(), 5);
        assert_eq!(app.blob_keys().await.len(), 5);
    }

    #[tokio::test]
    async fn binary_round_trip_is_byte_identical() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("dave").await;
        let data: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();

        let body = app.upload("blob.bin", &data, &token).await;
        let file = app.get(&routes::file(&reference_of(&body))).await;

        assert_eq!(file.status, 200);
        assert_eq!(file.bytes, data);
        assert_eq!(file.header("content-length"), data.len().to_string());
    }

    #[tokio::test]
    async fn gfycat_style_uses_three_words() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("erin").await;

        let res = app
            .upload_with_token(
                &routes::upload_with_style("gfycat"),
                "cat.gif",
                b"GIF89a....".to_vec(),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.body);
        let reference = reference_of(&res.body);
        let stem = reference.strip_suffix(".gif").unwrap();
        assert_eq!(stem.split('-').count(), 3);
        assert_eq!(res.body["mime_type"], "image/gif");
    }

    #[tokio::test]
    async fn unknown_style_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("frank").await;

        let res = app
            .upload_with_token(
                &routes::upload_with_style("fancy"),
                "a.txt",
                b"abc".to_vec(),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("gina").await;

        let res = app
            .upload_with_token(routes::UPLOADS, "empty.txt", Vec::new(), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "NO_FILE");
        assert!(app.blob_keys().await.is_empty());
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("hank").await;

        let form = reqwest::multipart::Form::new().text("note", "no file here");
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::UPLOADS))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["code"], "NO_FILE");
    }

    #[tokio::test]
    async fn upload_requires_token() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_with_token(routes::UPLOADS, "a.txt", b"abc".to_vec(), "not-a-token")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn oversized_upload_leaves_nothing_behind() {
        let app = TestApp::spawn_with_upload(UploadConfig {
            max_size: 1024,
            ..Default::default()
        })
        .await;
        let (_, token) = app.create_user("ivan").await;

        let res = app
            .upload_with_token(routes::UPLOADS, "big.bin", vec![7u8; 4096], &token)
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.code(), "PAYLOAD_TOO_LARGE");
        assert!(app.blob_keys().await.is_empty());
        assert_eq!(app.spooled_files(), 0);
        let items = app.get_with_token(routes::ITEMS, &token).await;
        assert_eq!(items.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn oversized_content_length_is_rejected_before_spooling() {
        let missing = tempfile::tempdir().unwrap().path().join("gone");
        let app = TestApp::spawn_with_upload(UploadConfig {
            max_size: 1024,
            // Any attempt to stage the body here fails with a 500.
            spool_dir: Some(missing.clone()),
            ..Default::default()
        })
        .await;
        let (_, token) = app.create_user("ivy").await;

        let res = app
            .upload_with_token(routes::UPLOADS, "big.bin", vec![7u8; 4096], &token)
            .await;

        assert_eq!(res.status, 413, "{}", res.body);
        assert_eq!(res.code(), "PAYLOAD_TOO_LARGE");
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn successful_upload_leaves_no_spooled_file() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("iris").await;

        app.upload("kept.txt", b"spooled then stored", &token).await;

        assert_eq!(app.spooled_files(), 0);
        assert_eq!(app.blob_keys().await.len(), 1);
    }

    #[tokio::test]
    async fn quota_is_enforced_per_owner() {
        let app = TestApp::spawn_with_upload(UploadConfig {
            max_size: 1024,
            user_quota: 100,
            ..Default::default()
        })
        .await;
        let (_, token) = app.create_user("judy").await;
        let (_, other) = app.create_user("kate").await;

        app.upload("first.bin", &[1u8; 95], &token).await;
        let res = app
            .upload_with_token(routes::UPLOADS, "second.bin", vec![2u8; 10], &token)
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.code(), "QUOTA_EXCEEDED");
        assert_eq!(app.blob_keys().await.len(), 1);

        // Another owner has their own quota.
        app.upload("theirs.bin", &[3u8; 10], &other).await;
    }
}

mod resolve {
    use super::*;

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::file("does-not-exist")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn expired_reference_is_gone() {
        let app = TestApp::spawn_with_upload(UploadConfig {
            expires_in: Duration::from_secs(1),
            ..Default::default()
        })
        .await;
        let (_, token) = app.create_user("leo").await;
        let body = app.upload("soon.txt", b"bye", &token).await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let res = app.get(&routes::file(&reference_of(&body))).await;

        assert_eq!(res.status, 410);
        assert_eq!(res.code(), "EXPIRED");
    }

    #[tokio::test]
    async fn concurrent_downloads_are_all_counted() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("mia").await;
        let reference = reference_of(&app.upload("pic.txt", b"count me", &token).await);

        let path = routes::file(&reference);
        let requests = (0..10).map(|_| app.get(&path));
        for res in futures::future::join_all(requests).await {
            assert_eq!(res.status, 200);
        }

        let item = app
            .catalog()
            .item_by_reference(&reference)
            .await
            .unwrap()
            .unwrap();
        assert!(item.access_count >= 10);
        assert!(item.last_accessed_at.is_some());
    }
}

mod manage {
    use super::*;

    #[tokio::test]
    async fn list_items_is_paginated_newest_first() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("nina").await;
        for name in ["a.txt", "b.txt", "c.txt"] {
            app.upload(name, name.as_bytes(), &token).await;
        }

        let res = app
            .get_with_token(&format!("{}?page=1&limit=2", routes::ITEMS), &token)
            .await;

        assert_eq!(res.status, 200);
        let items = res.body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["original_name"], "c.txt");
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn list_only_shows_own_items() {
        let app = TestApp::spawn().await;
        let (_, alice) = app.create_user("olga").await;
        let (_, bob) = app.create_user("pete").await;
        app.upload("mine.txt", b"mine", &alice).await;

        let res = app.get_with_token(routes::ITEMS, &bob).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["items"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn delete_removes_blob_and_row_once() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("quinn").await;
        let body = app.upload("gone.txt", b"gone", &token).await;
        let id = body["id"].as_str().unwrap();

        let first = app.delete_with_token(&routes::item(id), &token).await;
        assert_eq!(first.status, 204);
        assert!(app.blob_keys().await.is_empty());
        assert_eq!(app.get(&routes::file(&reference_of(&body))).await.status, 404);

        let second = app.delete_with_token(&routes::item(id), &token).await;
        assert_eq!(second.status, 404);
        assert_eq!(second.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn cannot_delete_someone_elses_item() {
        let app = TestApp::spawn().await;
        let (_, owner) = app.create_user("rosa").await;
        let (_, intruder) = app.create_user("sam").await;
        let body = app.upload("private.txt", b"private", &owner).await;

        let res = app
            .delete_with_token(&routes::item(body["id"].as_str().unwrap()), &intruder)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");
        assert_eq!(app.blob_keys().await.len(), 1);
    }

    #[tokio::test]
    async fn delete_with_malformed_id_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("tina").await;

        let res = app.delete_with_token(&routes::item("nope"), &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn stats_sum_sizes_and_views() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("uma").await;
        let body = app.upload("one.txt", b"12345", &token).await;
        app.upload("two.txt", b"678", &token).await;
        app.get(&routes::file(&reference_of(&body))).await;

        let res = app.get_with_token(routes::STATS, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total_items"], 2);
        assert_eq!(res.body["total_size"], 8);
        assert_eq!(res.body["total_views"], 1);
        assert_eq!(res.body["quota"], UploadConfig::default().user_quota);
        assert_eq!(res.body["top_mime_types"][0]["count"], 2);
    }
}
