//! HTTP surface: landing page, health check, and the metrics endpoint.
//!
//! Every `/metrics` request drives one full collection cycle, so the
//! endpoint reflects the fabric at scrape time. Only a fetch failure maps
//! to an error response; degraded cycles return 200 with `scrape_ok 0` in
//! the body.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use exporter_lib::Collector;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state.
pub struct AppState {
    pub collector: Collector,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn healthz() -> impl IntoResponse {
    Json(Health { status: "ok" })
}

async fn index() -> Html<&'static str> {
    Html(
        "<html>\
         <head><title>InfiniBand exporter</title></head>\
         <body><h1>InfiniBand exporter</h1>\
         <p><a href=\"/metrics\">Metrics</a></p>\
         </body></html>",
    )
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.collector.run_cycle().await {
        Ok(outcome) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            outcome.body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "collection cycle failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("collection failed: {err:#}\n"),
            )
                .into_response()
        }
    }
}

/// Create the exporter router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{port}");
    info!(addr = %addr, "starting exporter server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
