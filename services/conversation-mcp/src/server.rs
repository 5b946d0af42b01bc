//! HTTP transport: JSON-RPC on `POST /mcp` plus health and metrics

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use mcp_core::RpcHandler;
use metrics_exporter_prometheus::PrometheusHandle;
use oauth_client::OAuthClient;
use serde_json::{Value, json};
use tracing::{Instrument, debug, info_span};

/// Time allowed for in-flight requests to finish after a shutdown signal.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime counters reported on `/health`
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    /// Requests answered with a JSON-RPC error object
    pub errors_total: Arc<AtomicU64>,
    pub in_flight: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Holds one slot of `in_flight` until dropped, including when the client
/// disconnects and the handler future is cancelled.
struct InFlightGuard(Arc<AtomicU64>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub rpc: RpcHandler,
    pub oauth: Arc<OAuthClient>,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` caps concurrently handled requests.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

fn has_error(response: &Value) -> bool {
    match response {
        Value::Array(items) => items.iter().any(has_error),
        other => other.get("error").is_some(),
    }
}

/// JSON-RPC endpoint. Notification-only payloads get `202 Accepted`.
async fn mcp_handler(State(state): State<AppState>, body: String) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let metrics = &state.metrics;
    metrics.requests_total.fetch_add(1, Ordering::Relaxed);
    let in_flight = InFlightGuard::enter(&metrics.in_flight);

    let response = state
        .rpc
        .handle_text(&body)
        .instrument(info_span!("mcp_request", request_id = %request_id))
        .await;

    drop(in_flight);

    match response {
        Some(response) => {
            if has_error(&response) {
                metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            }
            debug!(request_id, "mcp response ready");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::HeaderName::from_static("x-request-id"), request_id),
                ],
                response.to_string(),
            )
                .into_response()
        }
        None => (
            StatusCode::ACCEPTED,
            [(header::HeaderName::from_static("x-request-id"), request_id)],
        )
            .into_response(),
    }
}

/// Service status, counters, tool count and token cache state. Never the token.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let token = state.oauth.status().await;
    let body = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
        "errors_total": state.metrics.errors_total.load(Ordering::Relaxed),
        "in_flight": state.metrics.in_flight.load(Ordering::Relaxed),
        "tools": state.rpc.dispatch().registry().len(),
        "token": token,
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointsConfig;
    use crate::tools::register_conversation_tools;
    use crate::tools::upstream::tests::{api_for, start_mock};
    use axum::body::Body;
    use axum::http::Request;
    use mcp_core::{DispatchServer, ServerInfo, ToolRegistry};
    use tower::ServiceExt;

    /// PrometheusHandle without installing the global recorder.
    fn test_prometheus_handle() -> PrometheusHandle {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle()
    }

    async fn test_state() -> AppState {
        let (base, _, _) = start_mock(|_| (200, r#"{"data":[]}"#.to_string())).await;
        let api = api_for(&base);
        let registry = Arc::new(ToolRegistry::new());
        register_conversation_tools(&registry, &api, &EndpointsConfig::default());
        let oauth = api.oauth().clone();
        AppState {
            rpc: RpcHandler::new(
                DispatchServer::new(registry),
                ServerInfo {
                    name: "test".into(),
                    version: "0.1.0".into(),
                },
            ),
            oauth,
            metrics: ServiceMetrics::new(),
            prometheus: test_prometheus_handle(),
        }
    }

    fn rpc_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn tools_list_over_http() {
        let app = build_router(test_state().await, 100);
        let response = app
            .oneshot(rpc_request(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = body_json(response).await;
        assert_eq!(json["result"]["tools"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn tools_call_over_http() {
        let app = build_router(test_state().await, 100);
        let response = app
            .oneshot(rpc_request(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"conversation_state_search","arguments":{"contactCenterId":"c"}}}"#,
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["id"], 7);
        assert_eq!(json["result"]["structuredContent"]["status"], "success");
        assert!(json["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn notification_is_accepted_without_body() {
        let app = build_router(test_state().await, 100);
        let response = app
            .oneshot(rpc_request(
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn health_reports_counters_and_token_state() {
        let state = test_state().await;
        state.metrics.requests_total.fetch_add(4, Ordering::Relaxed);
        let app = build_router(state, 100);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["requests_served"], 4);
        assert_eq!(json["tools"], 3);
        assert_eq!(json["token"]["cached"], false);
        assert!(!json.to_string().contains("at_"));
    }

    #[tokio::test]
    async fn health_shows_cached_token_after_a_call() {
        let app = build_router(test_state().await, 100);
        app.clone()
            .oneshot(rpc_request(
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"conversation_state_transcripts","arguments":{"ucid":"u"}}}"#,
            ))
            .await
            .unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["token"]["cached"], true);
        assert_eq!(json["token"]["valid"], true);
        assert!(json["token"].get("access_token").is_none());
    }

    #[tokio::test]
    async fn parse_error_counts_as_error() {
        let state = test_state().await;
        let errors = state.metrics.errors_total.clone();
        let app = build_router(state, 100);
        let response = app.oneshot(rpc_request("{oops")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], -32700);
        assert_eq!(errors.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn metrics_endpoint_is_prometheus_text() {
        let app = build_router(test_state().await, 100);
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
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
    }

    #[tokio::test]
    async fn in_flight_is_released_when_handler_is_cancelled() {
        let metrics = ServiceMetrics::new();
        let counter = metrics.in_flight.clone();
        let handle = tokio::spawn(async move {
            let _guard = InFlightGuard::enter(&metrics.in_flight);
            std::future::pending::<()>().await;
        });

        while counter.load(Ordering::Relaxed) == 0 {
            tokio::task::yield_now().await;
        }
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
