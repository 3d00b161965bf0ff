use crate::config::ServerConfig;
use crate::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::future::join_all;
use futures::stream::Stream;
use metrics_exporter_prometheus::PrometheusHandle;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::mcp::handler::{orphan_error, McpHandler};
use crate::mcp::jsonrpc::{self, Incoming, JsonRpcResponse};
use crate::mcp::session::{Session, SessionError, SessionManager, SESSION_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub handler: Arc<McpHandler>,
    pub keep_alive: Duration,
}

/// Streamable HTTP transport: one endpoint, three verbs
pub struct McpServer {
    handler: Arc<McpHandler>,
    sessions: Arc<SessionManager>,
    config: ServerConfig,
    metrics: Option<PrometheusHandle>,
}

impl McpServer {
    pub fn new(handler: Arc<McpHandler>, sessions: Arc<SessionManager>, config: ServerConfig) -> Self {
        Self {
            handler,
            sessions,
            config,
            metrics: None,
        }
    }

    /// Serve GET /metrics from this recorder handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// POST - JSON-RPC request or batch
    async fn post_handler(
        State(state): State<AppState>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let incoming = match jsonrpc::decode(&body) {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!("Rejected request body: {}", e);
                return json_response(StatusCode::BAD_REQUEST, jsonrpc::encode(&orphan_error(e)));
            }
        };

        let session = match session_id(&headers) {
            Some(id) => match state.sessions.lookup(id) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!("POST rejected: {}", e);
                    return StatusCode::NOT_FOUND.into_response();
                }
            },
            None => state.sessions.get_or_create(),
        };

        let body = match incoming {
            Incoming::Single(req) => state
                .handler
                .handle(req, &session)
                .await
                .map(|resp| jsonrpc::encode(&resp)),
            Incoming::Batch(items) => {
                let responses = handle_batch(&state.handler, &session, items).await;
                if responses.is_empty() {
                    None
                } else {
                    Some(jsonrpc::encode_batch(&responses))
                }
            }
        };

        let mut response = match body {
            Some(body) => json_response(StatusCode::OK, body),
            None => StatusCode::ACCEPTED.into_response(),
        };
        if let Ok(value) = HeaderValue::from_str(session.id()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(SESSION_HEADER), value);
        }
        response
    }

    /// GET - SSE stream of push events for the session
    async fn sse_handler(
        State(state): State<AppState>,
        headers: HeaderMap,
    ) -> std::result::Result<
        Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>,
        StatusCode,
    > {
        let id = session_id(&headers).ok_or_else(|| {
            tracing::warn!("SSE request without {} header", SESSION_HEADER);
            StatusCode::NOT_FOUND
        })?;

        let session = state.sessions.lookup(id).map_err(|e| {
            tracing::warn!("SSE rejected: {}", e);
            StatusCode::NOT_FOUND
        })?;

        let mut events = session.open_stream().map_err(|e| {
            tracing::warn!("SSE rejected: {}", e);
            match e {
                SessionError::StreamBusy(_) => StatusCode::CONFLICT,
                _ => StatusCode::NOT_FOUND,
            }
        })?;

        let stream = async_stream::stream! {
            while let Some(event) = events.next_event().await {
                let id = event.id;
                yield std::result::Result::<Event, Infallible>::Ok(Event::default()
                    .event("message")
                    .id(id.to_string())
                    .data(event.data));
                // Resumed only after the body took the previous event
                events.ack(id);
            }
            tracing::debug!(session_id = events.session_id(), "Session ended, closing SSE stream");
        };

        Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive).text("ping")))
    }

    /// DELETE - tear down the session
    async fn delete_handler(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
        let Some(id) = session_id(&headers) else {
            tracing::warn!("DELETE without {} header", SESSION_HEADER);
            return StatusCode::NOT_FOUND;
        };

        match state.sessions.destroy(id) {
            Ok(()) => StatusCode::OK,
            Err(e) => {
                tracing::warn!("DELETE rejected: {}", e);
                StatusCode::NOT_FOUND
            }
        }
    }

    pub fn router(&self) -> Router {
        let app_state = AppState {
            sessions: self.sessions.clone(),
            handler: self.handler.clone(),
            keep_alive: self.config.keep_alive(),
        };

        let mcp_routes = Router::new()
            .route(
                &self.config.endpoint,
                get(Self::sse_handler)
                    .post(Self::post_handler)
                    .delete(Self::delete_handler),
            )
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(app_state);

        let mut router = Router::new()
            .route("/health", get(crate::api::routes::health))
            .merge(mcp_routes);

        if let Some(handle) = &self.metrics {
            router = router.merge(
                Router::new()
                    .route("/metrics", get(crate::api::routes::metrics))
                    .with_state(handle.clone()),
            );
        }

        router.layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("MCP endpoint at http://{}{}", addr, self.config.endpoint);

        let sessions = self.sessions.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                // Ends open SSE streams so graceful shutdown can complete
                sessions.shutdown();
            })
            .await
            .map_err(|e| crate::Error::Server(e.to_string()))?;

        Ok(())
    }
}

async fn handle_batch(
    handler: &McpHandler,
    session: &Session,
    items: Vec<std::result::Result<jsonrpc::JsonRpcRequest, jsonrpc::DecodeError>>,
) -> Vec<JsonRpcResponse> {
    let pending = items.into_iter().map(|item| async move {
        match item {
            Ok(req) => handler.handle(req, session).await,
            Err(e) => Some(orphan_error(e)),
        }
    });

    join_all(pending).await.into_iter().flatten().collect()
}

/// Absent header is `None`; a header that is not valid text never matches a session.
fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .map(|v| v.to_str().unwrap_or_default())
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::registry::CapabilityRegistry;
    use crate::mcp::types::Implementation;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn server() -> McpServer {
        let handler = McpHandler::new(
            Arc::new(CapabilityRegistry::new()),
            Implementation::new("huddle-test", "0.0.1"),
            None,
        );
        McpServer::new(
            Arc::new(handler),
            Arc::new(SessionManager::new()),
            ServerConfig::default(),
        )
    }

    fn post(body: &str, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_sets_session_header() {
        let server = server();
        let response = server
            .router()
            .oneshot(post(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();
        assert_eq!(server.sessions().current().unwrap().id(), id);
        assert_eq!(body_json(response).await["result"], json!({}));
    }

    #[tokio::test]
    async fn test_parse_error_is_bad_request() {
        let response = server()
            .router()
            .oneshot(post("{oops", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let response = server()
            .router()
            .oneshot(post(
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().contains_key(SESSION_HEADER));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_header() {
        let server = server();
        let router = server.router();

        let response = router
            .clone()
            .oneshot(post(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#, Some("stale")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(server.sessions().current().is_none());

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/mcp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_requires_session() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/mcp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let body = r#"[
            {"jsonrpc":"2.0","id":"a","method":"ping"},
            {"jsonrpc":"2.0","method":"notifications/initialized"},
            {"nonsense":true},
            {"jsonrpc":"2.0","id":"b","method":"tools/list"}
        ]"#;
        let response = server().router().oneshot(post(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], "a");
        assert!(items[1]["id"].is_null());
        assert_eq!(items[1]["error"]["code"], -32600);
        assert_eq!(items[2]["id"], "b");
        assert_eq!(items[2]["result"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn test_health_and_no_metrics_by_default() {
        let router = server().router();

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let metrics = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(metrics.status(), StatusCode::NOT_FOUND);
    }
}
