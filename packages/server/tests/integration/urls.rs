use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};

use crate::common::{BASE_URL, TestApp, routes};

/// Poll analytics until the asynchronous click writer has caught up.
async fn wait_for_clicks(app: &TestApp, id: i64, token: &str, expected: u64) -> Value {
    for _ in 0..50 {
        let res = app.get_with_token(&routes::url_analytics(id), token).await;
        assert_eq!(res.status, 200);
        if res.body["total_clicks"].as_u64() == Some(expected) {
            return res.body;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("clicks never reached {expected}");
}

mod create {
    use super::*;

    #[tokio::test]
    async fn vanity_code_redirects_and_counts_click() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("alice").await;

        let created = app
            .shorten(&json!({ "url": "https://example.com/a", "custom_code": "abcd" }), &token)
            .await;
        assert_eq!(created["short_code"], "abcd");
        assert_eq!(created["is_vanity"], true);
        assert_eq!(created["short_url"], format!("{BASE_URL}/s/abcd"));

        let res = app.get(&routes::short("abcd")).await;
        assert_eq!(res.status, 307);
        assert_eq!(res.header("location"), "https://example.com/a");

        let analytics = wait_for_clicks(&app, created["id"].as_i64().unwrap(), &token, 1).await;
        assert_eq!(analytics["unique_clicks"], 1);
        assert_eq!(analytics["clicks_by_day"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn generated_code_is_eight_alphanumerics() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("bob").await;

        let created = app
            .shorten(&json!({ "url": "http://example.org/path?q=1" }), &token)
            .await;

        let code = created["short_code"].as_str().unwrap();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(created["is_vanity"], false);
    }

    #[tokio::test]
    async fn duplicate_vanity_conflicts() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("carol").await;
        let body = json!({ "url": "https://example.com/a", "custom_code": "abcd" });
        app.shorten(&body, &token).await;

        let res = app.post_with_token(routes::URLS, &body, &token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn invalid_vanity_codes_are_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("dave").await;

        for code in ["ab", "good/bad", "spaces here", " abcd ", "abcd\n", &"x".repeat(31)] {
            let res = app
                .post_with_token(
                    routes::URLS,
                    &json!({ "url": "https://example.com", "custom_code": code }),
                    &token,
                )
                .await;
            assert_eq!(res.status, 400, "code {code:?} should be rejected");
            assert_eq!(res.code(), "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn empty_vanity_code_generates_one() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("dora").await;

        let created = app
            .shorten(&json!({ "url": "https://example.com", "custom_code": "" }), &token)
            .await;

        assert_eq!(created["short_code"].as_str().unwrap().len(), 8);
        assert_eq!(created["is_vanity"], false);
    }

    #[tokio::test]
    async fn invalid_targets_are_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("erin").await;

        for url in ["not a url", "ftp://example.com/file", "javascript:alert(1)"] {
            let res = app
                .post_with_token(routes::URLS, &json!({ "url": url }), &token)
                .await;
            assert_eq!(res.status, 400, "url {url:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn past_expiry_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("frank").await;

        let res = app
            .post_with_token(
                routes::URLS,
                &json!({
                    "url": "https://example.com",
                    "expires_at": Utc::now() - chrono::Duration::hours(1),
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn create_requires_token() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::URLS, &json!({ "url": "https://example.com" }))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_MISSING");
    }
}

mod resolve {
    use super::*;

    #[tokio::test]
    async fn expired_and_unknown_codes_are_distinct() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("gina").await;
        app.shorten(
            &json!({
                "url": "https://example.com/soon",
                "custom_code": "soon",
                "expires_at": Utc::now() + chrono::Duration::seconds(1),
            }),
            &token,
        )
        .await;

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let expired = app.get(&routes::short("soon")).await;
        assert_eq!(expired.status, 410);
        assert_eq!(expired.code(), "EXPIRED");

        let unknown = app.get(&routes::short("nope")).await;
        assert_eq!(unknown.status, 404);
        assert_eq!(unknown.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn click_records_forwarded_client_details() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("hank").await;
        let created = app
            .shorten(&json!({ "url": "https://example.com/x", "custom_code": "track" }), &token)
            .await;
        let id = created["id"].as_i64().unwrap();

        for ip in ["203.0.113.7", "203.0.113.7", "198.51.100.1"] {
            let res = app
                .get_with_headers(
                    &routes::short("track"),
                    &[
                        ("x-forwarded-for", &format!("{ip}, 10.0.0.1")),
                        ("referer", "https://news.example/"),
                    ],
                )
                .await;
            assert_eq!(res.status, 307);
        }

        let analytics = wait_for_clicks(&app, id, &token, 3).await;
        assert_eq!(analytics["unique_clicks"], 2);
        assert_eq!(analytics["top_referrers"][0]["key"], "https://news.example/");
        assert_eq!(analytics["top_referrers"][0]["count"], 3);

        let url = app.catalog().url_by_id(id as i32).await.unwrap().unwrap();
        assert!(url.access_count >= 3);
    }
}

mod manage {
    use super::*;

    #[tokio::test]
    async fn list_shows_active_urls_newest_first() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("ivan").await;
        app.shorten(&json!({ "url": "https://example.com/1", "custom_code": "first" }), &token)
            .await;
        app.shorten(&json!({ "url": "https://example.com/2", "custom_code": "second" }), &token)
            .await;

        let res = app.get_with_token(routes::URLS, &token).await;

        assert_eq!(res.status, 200);
        let urls = res.body.as_array().unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0]["short_code"], "second");
    }

    #[tokio::test]
    async fn delete_by_code_deactivates_and_reserves_code() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("judy").await;
        app.shorten(&json!({ "url": "https://example.com", "custom_code": "retired" }), &token)
            .await;

        let res = app.delete_with_token(&routes::url("retired"), &token).await;
        assert_eq!(res.status, 204);

        assert_eq!(app.get(&routes::short("retired")).await.status, 404);
        assert_eq!(
            app.get_with_token(routes::URLS, &token).await.body.as_array().unwrap().len(),
            0
        );

        let again = app
            .post_with_token(
                routes::URLS,
                &json!({ "url": "https://example.com", "custom_code": "retired" }),
                &token,
            )
            .await;
        assert_eq!(again.status, 409);

        let second = app.delete_with_token(&routes::url("retired"), &token).await;
        assert_eq!(second.status, 404);
    }

    #[tokio::test]
    async fn delete_by_id_checks_owner() {
        let app = TestApp::spawn().await;
        let (_, owner) = app.create_user("kate").await;
        let (_, intruder) = app.create_user("leo").await;
        let created = app
            .shorten(&json!({ "url": "https://example.com" }), &owner)
            .await;
        let id = created["id"].as_i64().unwrap();

        let denied = app.delete_with_token(&routes::url(id), &intruder).await;
        assert_eq!(denied.status, 403);
        assert_eq!(denied.code(), "PERMISSION_DENIED");

        let ok = app.delete_with_token(&routes::url(id), &owner).await;
        assert_eq!(ok.status, 204);
    }

    #[tokio::test]
    async fn update_sets_and_clears_expiry() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("mia").await;
        let created = app
            .shorten(&json!({ "url": "https://example.com" }), &token)
            .await;
        let id = created["id"].as_i64().unwrap();
        let later = Utc::now() + chrono::Duration::days(2);

        let set = app
            .patch_with_token(&routes::url(id), &json!({ "expires_at": later }), &token)
            .await;
        assert_eq!(set.status, 200, "{}", set.body);
        assert!(set.body["expires_at"].is_string());

        let cleared = app
            .patch_with_token(&routes::url(id), &json!({ "expires_at": null }), &token)
            .await;
        assert_eq!(cleared.status, 200);
        assert!(cleared.body["expires_at"].is_null());

        let empty = app.patch_with_token(&routes::url(id), &json!({}), &token).await;
        assert_eq!(empty.status, 400);

        let past = app
            .patch_with_token(
                &routes::url(id),
                &json!({ "expires_at": Utc::now() - chrono::Duration::minutes(1) }),
                &token,
            )
            .await;
        assert_eq!(past.status, 400);
    }

    #[tokio::test]
    async fn analytics_of_foreign_url_is_denied() {
        let app = TestApp::spawn().await;
        let (_, owner) = app.create_user("nina").await;
        let (_, intruder) = app.create_user("olga").await;
        let created = app
            .shorten(&json!({ "url": "https://example.com" }), &owner)
            .await;

        let res = app
            .get_with_token(
                &routes::url_analytics(created["id"].as_i64().unwrap()),
                &intruder,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}
