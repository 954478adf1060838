mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::TestServer;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use std::time::Duration;

use expiring_shortener::api::middleware::rate_limit::REMAINING_HEADER;
use expiring_shortener::application::services::RateLimiter;

fn expiration(json: &serde_json::Value) -> DateTime<Utc> {
    json["expirationDate"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_shorten_generates_code() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let response = server
        .post("/shorten")
        .json(&json!({ "longUrl": "https://example.com/some/page" }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let json = response.json::<serde_json::Value>();
    let short_url = json["shortUrl"].as_str().unwrap();
    let code = short_url
        .strip_prefix(&format!("{}/", common::BASE_URL))
        .unwrap();

    assert_eq!(code.len(), 8);
    assert_eq!(json["longUrl"], "https://example.com/some/page");
    assert_eq!(
        response.header(header::LOCATION).to_str().unwrap(),
        short_url
    );
    assert_eq!(
        expiration(&json),
        common::base_time() + TimeDelta::minutes(1440)
    );
}

#[tokio::test]
async fn test_shorten_with_custom_alias() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let response = server
        .post("/shorten")
        .json(&json!({
            "longUrl": "https://example.com",
            "customAlias": "promo"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["shortUrl"], "https://sho.rt/promo");
    assert_eq!(
        response.header(header::LOCATION).to_str().unwrap(),
        "https://sho.rt/promo"
    );
}

#[tokio::test]
async fn test_shorten_duplicate_alias_conflicts() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let request = json!({
        "longUrl": "https://example.com/a",
        "customAlias": "taken"
    });

    server
        .post("/shorten")
        .json(&request)
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/shorten")
        .json(&json!({
            "longUrl": "https://example.com/b",
            "customAlias": "taken"
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "alias_taken");

    // The first mapping is untouched.
    server
        .get("/taken")
        .await
        .assert_status(StatusCode::MOVED_PERMANENTLY);
}

#[tokio::test]
async fn test_shorten_blank_alias_is_ignored() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let response = server
        .post("/shorten")
        .json(&json!({
            "longUrl": "https://example.com",
            "customAlias": "   "
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let json = response.json::<serde_json::Value>();
    let short_url = json["shortUrl"].as_str().unwrap();
    assert_eq!(short_url.len(), common::BASE_URL.len() + 1 + 8);
}

#[tokio::test]
async fn test_shorten_same_url_twice_gives_distinct_codes() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let request = json!({ "longUrl": "https://example.com/same" });

    let first = server.post("/shorten").json(&request).await;
    let second = server.post("/shorten").json(&request).await;

    first.assert_status(StatusCode::CREATED);
    second.assert_status(StatusCode::CREATED);

    assert_ne!(
        first.json::<serde_json::Value>()["shortUrl"],
        second.json::<serde_json::Value>()["shortUrl"]
    );
}

#[tokio::test]
async fn test_shorten_invalid_url() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    for long_url in [
        "",
        "not a url",
        "ftp://example.com/file",
        "javascript:alert(1)",
        "https://example.com/a\nb",
        "https://example.com/a\tb",
    ] {
        let response = server
            .post("/shorten")
            .json(&json!({ "longUrl": long_url }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);

        let json = response.json::<serde_json::Value>();
        assert_eq!(json["error"]["code"], "invalid_input", "for {long_url:?}");
    }

    assert!(app.repository.is_empty());
}

#[tokio::test]
async fn test_shorten_invalid_alias() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    for alias in ["bad alias", "slash/inside", "health", "shorten"] {
        let response = server
            .post("/shorten")
            .json(&json!({
                "longUrl": "https://example.com",
                "customAlias": alias
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_shorten_explicit_expiration() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let expires_at = common::base_time() + TimeDelta::hours(2);

    let response = server
        .post("/shorten")
        .json(&json!({
            "longUrl": "https://example.com",
            "expirationDate": expires_at
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(expiration(&response.json::<serde_json::Value>()), expires_at);
}

#[tokio::test]
async fn test_shorten_expiration_out_of_range() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let past = common::base_time() - TimeDelta::minutes(1);
    let now = common::base_time();
    let beyond_horizon = common::base_time() + TimeDelta::minutes(10080) + TimeDelta::seconds(1);

    for expires_at in [past, now, beyond_horizon] {
        let response = server
            .post("/shorten")
            .json(&json!({
                "longUrl": "https://example.com",
                "expirationDate": expires_at
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    // Exactly at the horizon is accepted.
    server
        .post("/shorten")
        .json(&json!({
            "longUrl": "https://example.com",
            "expirationDate": common::base_time() + TimeDelta::minutes(10080)
        }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_shorten_rate_limited_after_burst() {
    let limits =
        RateLimiter::sustained_and_burst(30, Duration::from_secs(60), 2, Duration::from_secs(1));
    let app = common::create_test_app_with_limits(limits, false);
    let server = TestServer::new(app.router()).unwrap();

    let request = json!({ "longUrl": "https://example.com" });

    let first = server.post("/shorten").json(&request).await;
    first.assert_status(StatusCode::CREATED);
    assert_eq!(first.header(REMAINING_HEADER).to_str().unwrap(), "1");

    server
        .post("/shorten")
        .json(&request)
        .await
        .assert_status(StatusCode::CREATED);

    let denied = server.post("/shorten").json(&request).await;
    denied.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied.header(header::RETRY_AFTER).to_str().unwrap(), "1");
    assert_eq!(
        denied.json::<serde_json::Value>()["error"]["code"],
        "rate_limited"
    );

    app.clock.advance(TimeDelta::seconds(1));

    server
        .post("/shorten")
        .json(&request)
        .await
        .assert_status(StatusCode::CREATED);

    // Denied requests never reach the store.
    assert_eq!(app.repository.len(), 3);
}

#[tokio::test]
async fn test_shorten_rate_limit_keyed_by_forwarded_client() {
    let limits =
        RateLimiter::sustained_and_burst(1, Duration::from_secs(60), 1, Duration::from_secs(1));
    let app = common::create_test_app_with_limits(limits, true);
    let server = TestServer::new(app.router()).unwrap();

    let request = json!({ "longUrl": "https://example.com" });
    let forwarded_for = HeaderName::from_static("x-forwarded-for");

    for client in ["203.0.113.7", "203.0.113.8"] {
        server
            .post("/shorten")
            .add_header(forwarded_for.clone(), HeaderValue::from_static(client))
            .json(&request)
            .await
            .assert_status(StatusCode::CREATED);
    }

    server
        .post("/shorten")
        .add_header(
            forwarded_for.clone(),
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        )
        .json(&request)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_redirect_is_not_rate_limited() {
    let limits =
        RateLimiter::sustained_and_burst(1, Duration::from_secs(60), 1, Duration::from_secs(1));
    let app = common::create_test_app_with_limits(limits, false);
    app.insert("open", "https://example.com", None).await;

    let server = TestServer::new(app.router()).unwrap();

    for _ in 0..5 {
        server
            .get("/open")
            .await
            .assert_status(StatusCode::MOVED_PERMANENTLY);
    }
}
