//! Integration tests for the exporter HTTP endpoints.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use exporter_lib::{Collector, CollectorOptions, FixtureSource, NameMap, PerfqueryReset};
use std::io::Write;
use std::sync::Arc;
use tower::ServiceExt;

const REPORT: &str = "Errors for 0x1 \"sw1\"\n   \
    GUID 0x1 port ALL: [PortXmitData == 5]\n   \
    GUID 0x1 port 1:[PortXmitData == 5]\n      \
    Link info: 1 1[  ] == (4X  25.0 Gbps Active/  LinkUp) ==>      2   1[  ] \"node2\"\n";

struct AppState {
    collector: Collector,
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn index() -> Html<&'static str> {
    Html("<html><body><a href=\"/metrics\">Metrics</a></body></html>")
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.collector.run_cycle().await {
        Ok(outcome) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            outcome.body,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("collection failed: {err:#}\n"),
        )
            .into_response(),
    }
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn app_for_fixture(path: &std::path::Path) -> Router {
    let collector = Collector::new(
        Arc::new(NameMap::default()),
        Box::new(FixtureSource::new(path)),
        Box::new(PerfqueryReset),
        CollectorOptions {
            auto_reset: false,
            zero_absent_counters: false,
        },
    );
    create_test_router(Arc::new(AppState { collector }))
}

fn fixture_with(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_metrics_returns_prometheus_format() {
    let fixture = fixture_with(REPORT);
    let app = app_for_fixture(fixture.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = body_text(response).await;
    assert!(body.contains("infiniband_portxmitdata{"));
    assert!(body.contains("infiniband_speed{"));
    assert!(body.contains("infiniband_scrape_duration_seconds"));
    assert!(body.contains("infiniband_scrape_ok 1"));
}

#[tokio::test]
async fn test_metrics_reports_degraded_scrapes_with_status_200() {
    let fixture = fixture_with("not a report at all\n");
    let app = app_for_fixture(fixture.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("infiniband_scrape_ok 0"));
    assert!(!body.contains("infiniband_portxmitdata"));
}

#[tokio::test]
async fn test_metrics_returns_500_when_the_input_cannot_be_read() {
    let app = app_for_fixture(std::path::Path::new("/nonexistent/report.txt"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.contains("collection failed"));
}

#[tokio::test]
async fn test_healthz_returns_ok() {
    let fixture = fixture_with(REPORT);
    let app = app_for_fixture(fixture.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_index_links_to_metrics() {
    let fixture = fixture_with(REPORT);
    let app = app_for_fixture(fixture.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/metrics"));
}
