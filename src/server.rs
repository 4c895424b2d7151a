use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{CONTENT_TYPE, RETRY_AFTER},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use gateguard_interceptors::request::HookRequest;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::hook::{render_response, AfterInput};
use crate::metrics::GuardMetrics;
use crate::service::GuardService;

pub struct AppState {
    pub service: GuardService,
    pub metrics: GuardMetrics,
}

impl AppState {
    pub fn new(service: GuardService) -> Result<Self> {
        let metrics = GuardMetrics::new().context("Failed to build metrics registry")?;
        Ok(Self { service, metrics })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/hooks/before", post(before_hook))
        .route("/v1/hooks/after", post(after_hook))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "gateguard listening");
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown requested");
}

async fn before_hook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = HookRequest::from_slice(&body);
    let outcome = state.service.chain().before(request).await;
    let status = StatusCode::from_u16(outcome.http_status()).unwrap_or(StatusCode::OK);
    let mut response = (status, Json(outcome.to_hook_output())).into_response();
    if let Some(retry_after) = outcome.decision.retry_after {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after));
    }
    response
}

async fn after_hook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let input = AfterInput::parse(&body);
    let pass_through = input.passes_through(state.service.config().filters.redact_responses);
    let chain = state.service.chain();
    let mut cx = chain.context(input.request);
    let response = chain.after(&mut cx, input.response).await;

    if pass_through {
        let mut out = body.into_response();
        if let Some(content_type) = headers.get(CONTENT_TYPE) {
            out.headers_mut().insert(CONTENT_TYPE, content_type.clone());
        }
        return out;
    }
    let content_type = if response.is_string() {
        "text/plain; charset=utf-8"
    } else {
        "application/json"
    };
    (
        [(CONTENT_TYPE, HeaderValue::from_static(content_type))],
        render_response(&response),
    )
        .into_response()
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    let healthy = state.service.healthy().await;
    state.metrics.set_store_up(healthy);
    if healthy {
        (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "degraded", "store": "unreachable"})),
        )
            .into_response()
    }
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    state.metrics.sync(&state.service.chain().metrics().snapshot());
    state.metrics.render()
}
