use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use uuid::Uuid;

use mandate_core::middleware::REQUEST_ID_HEADER;
use mandate_winback::domain::types::WinbackSettings;
use mandate_winback::infra::email::HttpEmailGateway;
use mandate_winback::router::build_router;
use mandate_winback::state::AppState;

const SECRET: &str = "cron-secret";

/// Router over a disconnected database. Only routes that fail before
/// touching storage are exercised.
fn server(cron_secret: Option<&str>) -> TestServer {
    let state = AppState {
        db: DatabaseConnection::Disconnected,
        email: HttpEmailGateway::new("http://127.0.0.1:9/send".to_owned()).unwrap(),
        settings: WinbackSettings::default(),
        cron_secret: cron_secret.map(Arc::from),
    };
    TestServer::new(build_router(state)).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

#[tokio::test]
async fn healthz_should_return_200_with_request_id() {
    let resp = server(None).get("/healthz").await;
    resp.assert_status_ok();
    let id = resp.header(HeaderName::from_static(REQUEST_ID_HEADER));
    assert!(id.to_str().unwrap().parse::<Uuid>().is_ok());
}

#[tokio::test]
async fn readyz_should_fail_without_database() {
    let resp = server(None).get("/readyz").await;
    resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn run_should_require_bearer_secret() {
    let server = server(Some(SECRET));

    let resp = server.post("/winback/run").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = resp.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "UNAUTHORIZED");

    let resp = server
        .post("/winback/run")
        .add_header(AUTHORIZATION, bearer("wrong"))
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn enrollment_should_reject_ambiguous_target() {
    let resp = server(None)
        .post("/winback/enrollments")
        .json(&json!({
            "lead_id": Uuid::now_v7(),
            "sequence_id": Uuid::now_v7(),
            "lost_reason": "precio",
        }))
        .await;

    resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json();
    assert_eq!(body["kind"], "INVALID_ENROLLMENT");
}
