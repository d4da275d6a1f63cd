//! Entry point: wires the dispatch core to an axum HTTP server.

mod cache;
mod classifier;
mod config;
mod dispatcher;
mod envelope;
mod errors;
mod health;
mod intake;
mod local_methods;
mod metrics;
mod recovery;
mod retry;
mod selector;
mod state;
mod stats;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ProxyConfig;
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::errors::ProxyError;
use crate::intake::{parse_body, IntakeError, ParsedBody};
use crate::retry::RetryOrchestrator;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    let config = ProxyConfig::load();
    init_tracing(config.enable_json_logs);

    let state = AppState::new(config);
    info!(urls = ?state.config.rpc_urls, port = state.config.port, "starting rpc-proxy");

    tokio::spawn(recovery::run(Arc::clone(&state.health), state.probe_client.clone()));

    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(ProxyError::Bind)?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ProxyError::Bind)?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/rpc", post(rpc_handler).fallback(rpc_method_not_allowed))
        .route("/health", get(health_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Our own intake layer enforces MAX_REQUEST_SIZE with a JSON-RPC
        // shaped response; axum's built-in limit would short-circuit that.
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(config: &ProxyConfig) -> CorsLayer {
    let allow_origin = if config.cors_allows_all() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> =
            config.cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86_400))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received sigterm, shutting down"),
    }
}

async fn rpc_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match parse_body(&body, state.config.max_request_size) {
        Err(IntakeError::TooLarge) => {
            (StatusCode::PAYLOAD_TOO_LARGE, Json(ResponseEnvelope::request_too_large())).into_response()
        }
        Err(IntakeError::ParseError) => {
            (StatusCode::BAD_REQUEST, Json(ResponseEnvelope::parse_error())).into_response()
        }
        Ok(ParsedBody::Probe) => {
            let envelope = local_methods::probe_response(&state.chain_identity);
            (StatusCode::OK, Json(envelope)).into_response()
        }
        Ok(ParsedBody::Single(request)) => {
            let envelope = handle_envelope(&state, request).await;
            let status = response_status(&envelope);
            (status, Json(envelope)).into_response()
        }
        Ok(ParsedBody::Batch(requests)) => {
            let mut results = Vec::with_capacity(requests.len());
            for request in requests {
                results.push(handle_envelope(&state, request).await);
            }
            (StatusCode::OK, Json(results)).into_response()
        }
    }
}

fn response_status(envelope: &ResponseEnvelope) -> StatusCode {
    match &envelope.error {
        Some(err) if err.code == -32600 => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    }
}

/// Runs one envelope through shape validation, the local shortcut, the
/// cache, and finally the retry orchestrator, updating stats and metrics
/// along the way.
async fn handle_envelope(state: &AppState, request: RequestEnvelope) -> ResponseEnvelope {
    if !request.is_valid() {
        return ResponseEnvelope::invalid_request(request.id.clone());
    }

    if let Some(response) = local_methods::try_shortcut(&state.chain_identity, &request) {
        state.stats.record_success();
        state.metrics.requests_total.inc();
        return response;
    }

    let empty_params = Value::Array(vec![]);
    let params = request.params.as_ref().unwrap_or(&empty_params);
    let key = cache::cache_key(request.method_name(), params);

    if state.cache.enabled() {
        if let Some(mut cached) = state.cache.get(&key).await {
            cached.id = request.id.clone();
            state.stats.record_success();
            state.metrics.requests_total.inc();
            state.metrics.cache_hits_total.inc();
            return cached;
        }
        state.metrics.cache_misses_total.inc();
    }

    let orchestrator = RetryOrchestrator {
        selector: &state.selector,
        dispatcher: &state.dispatcher,
        max_retry_attempts: state.config.max_retry_attempts,
    };

    let response = match orchestrator.run(&state.health, &state.metrics, &request).await {
        Some(response) => response,
        None => ResponseEnvelope::internal_error(request.id.clone(), "no upstream endpoints configured"),
    };

    state.metrics.requests_total.inc();
    match &response.error {
        None => {
            state.stats.record_success();
            if state.cache.enabled() {
                state.cache.insert(key, response.clone()).await;
            }
        }
        Some(err) if err.code == -32050 || err.code == -32603 => {
            state.stats.record_proxy_failure();
            state.metrics.proxy_errors_total.inc();
        }
        Some(_) => {
            state.stats.record_success();
            state.stats.record_rpc_error();
            state.metrics.rpc_errors_total.inc();
        }
    }

    response
}

async fn rpc_method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(ResponseEnvelope::method_not_allowed())).into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let endpoints = state.health.snapshot().await;
    let healthy_count = endpoints.iter().filter(|e| e.is_healthy).count();
    let total_active: i64 = endpoints.iter().map(|e| e.active_requests).sum();
    let stats = state.stats.snapshot();

    let endpoints_json: Vec<Value> = endpoints
        .iter()
        .map(|e| {
            json!({
                "url": e.url,
                "isHealthy": e.is_healthy,
                "activeRequests": e.active_requests,
                "totalRequests": e.total_requests,
                "totalFailures": e.total_failures,
                "failureRate": e.failure_rate(),
                "averageResponseTime": e.average_response_time,
                "lastFailure": e.last_failure_at,
            })
        })
        .collect();

    let body = json!({
        "status": if healthy_count == 0 { "degraded" } else { "healthy" },
        "stats": {
            "totalRequests": stats.total_requests,
            "successfulRequests": stats.successful_requests,
            "failedRequests": stats.failed_requests,
            "rpcErrors": stats.rpc_errors,
            "proxyErrors": stats.proxy_errors,
            "requestsPerSecond": stats.requests_per_second,
            "uptime": stats.uptime_secs,
        },
        "rpcUrls": state.config.rpc_urls,
        "healthyEndpoints": healthy_count,
        "totalActiveRequests": total_active,
        "currentIndex": state.health.current_cursor(),
        "endpoints": endpoints_json,
        "cache": {
            "enabled": state.cache.enabled(),
            "size": state.cache.len().await,
            "ttl": state.cache.ttl().as_millis(),
        },
        "config": {
            "maxConcurrentRequests": state.config.max_concurrent_requests,
            "requestTimeout": state.config.request_timeout_ms,
            "maxRequestSize": state.config.max_request_size,
        },
    });

    (StatusCode::OK, Json(body)).into_response()
}
