mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use sqlx::PgPool;

#[tokio::test]
async fn test_health_endpoint_success() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let response = server.get("/health").await;

    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["store"]["status"], "ok");
    assert_eq!(json["checks"]["cache"]["status"], "ok");
}

#[tokio::test]
async fn test_health_endpoint_structure() {
    let app = common::create_test_app();
    let server = TestServer::new(app.router()).unwrap();

    let json = server.get("/health").await.json::<serde_json::Value>();

    assert!(json.get("status").is_some());
    assert!(json.get("version").is_some());
    assert!(json["checks"].get("store").is_some());
    assert!(json["checks"].get("cache").is_some());
    assert_eq!(json["sweeper"]["runs"], 0);
    assert_eq!(json["sweeper"]["failures"], 0);
    assert_eq!(json["sweeper"]["deleted"], 0);
}

#[tokio::test]
async fn test_health_route_is_not_a_short_code() {
    let app = common::create_test_app();
    app.insert("abc123", "https://example.com", None).await;

    let server = TestServer::new(app.router()).unwrap();

    server.get("/health").await.assert_status_ok();
    server
        .get("/abc123")
        .await
        .assert_status(StatusCode::MOVED_PERMANENTLY);
}

#[sqlx::test]
async fn test_health_endpoint_with_database(pool: PgPool) {
    let state = common::create_pg_state(pool);
    let server = TestServer::new(common::create_router(state)).unwrap();

    let response = server.get("/health").await;

    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["checks"]["store"]["status"], "ok");
    assert_eq!(json["checks"]["cache"]["status"], "ok");
}
