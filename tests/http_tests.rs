//! HTTP surface smoke tests: health, metrics and auth gating. Uses a lazy
//! database pool so no PostgreSQL instance is required.

use axum_test::TestServer;
use sqlx::postgres::PgPoolOptions;

use parley::config::{
    CorsSettings, DatabaseSettings, JwtSettings, ServerSettings, Settings, WebSocketSettings,
};
use parley::presentation::http::routes::create_router;
use parley::startup::AppState;

fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://postgres@localhost/parley_test".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
        },
        jwt: JwtSettings {
            secret: "test-secret-test-secret-test-secret-1234".into(),
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings {
            max_message_size: 65536,
        },
        environment: "test".into(),
    }
}

fn test_server() -> TestServer {
    let settings = test_settings();
    let db = PgPoolOptions::new()
        .connect_lazy(&settings.database.url)
        .expect("lazy pool");
    let state = AppState::new(db, settings);
    TestServer::new(create_router(state)).expect("test server")
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let server = test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn liveness_endpoint_is_alive() {
    let server = test_server();

    let response = server.get("/health/live").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let server = test_server();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    assert!(response.text().contains("parley"));
}

#[tokio::test]
async fn api_routes_require_a_bearer_token() {
    let server = test_server();

    let response = server.get("/api/v1/friendships/friends").await;
    response.assert_status_unauthorized();

    let response = server
        .get("/api/v1/conversations")
        .authorization_bearer("not-a-real-token")
        .await;
    response.assert_status_unauthorized();
}
