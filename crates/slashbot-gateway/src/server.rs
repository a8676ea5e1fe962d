//! The gateway HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use slashbot_core::error_codes;
use slashbot_kernel::Kernel;
use slashbot_plugins::GatewayError;

use crate::auth::TokenGuard;

/// Largest request body the gateway accepts (4 MB).
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// An `/rpc` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// Method name to dispatch.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// An `/rpc` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    /// Whether the method succeeded.
    pub ok: bool,
    /// The result, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayError>,
}

impl RpcResponse {
    fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(error: GatewayError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Clone)]
struct GatewayState {
    kernel: Arc<Kernel>,
    guard: TokenGuard,
}

/// The gateway server.
#[derive(Debug)]
pub struct Gateway {
    kernel: Arc<Kernel>,
}

impl Gateway {
    /// Create a gateway over a kernel.
    #[must_use]
    pub fn new(kernel: Arc<Kernel>) -> Self {
        Self { kernel }
    }

    /// Build the router (exposed separately for in-process tests).
    #[must_use]
    pub fn router(&self) -> Router {
        let guard = TokenGuard::new(self.kernel.config().gateway.auth_token.as_deref());
        let state = GatewayState {
            kernel: Arc::clone(&self.kernel),
            guard,
        };
        Router::new()
            .route("/health", get(health))
            .route("/rpc", post(rpc))
            .fallback(registered_routes)
            .with_state(state)
    }

    /// Bind the configured `{host, port}` and serve until cancelled.
    ///
    /// Returns the bound address (useful with port 0) and the serve
    /// task's handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub async fn bind(
        self,
        cancel: CancellationToken,
    ) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<std::io::Result<()>>)> {
        let host = self.kernel.config().gateway.host.clone();
        let port = self.kernel.config().gateway.port;
        let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "Gateway listening");

        let router = self.router();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        });
        Ok((addr, handle))
    }
}

/// `GET /health` — unauthenticated.
async fn health(State(state): State<GatewayState>) -> Json<Value> {
    let health = state.kernel.health();
    Json(serde_json::to_value(&health).unwrap_or(Value::Null))
}

/// `POST /rpc` — bearer-authenticated method dispatch.
async fn rpc(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Result<Json<RpcRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    if !state.guard.check(&headers) {
        return unauthorized();
    }

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RpcResponse::failure(GatewayError::new(
                    "INVALID_REQUEST",
                    rejection.to_string(),
                ))),
            )
                .into_response();
        },
    };

    let Some(method) = state.kernel.gateway_methods().get(&request.method) else {
        debug!(method = %request.method, "Unknown gateway method");
        return (
            StatusCode::OK,
            Json(RpcResponse::failure(GatewayError::new(
                error_codes::UNKNOWN_METHOD,
                format!("no method registered as {}", request.method),
            ))),
        )
            .into_response();
    };

    let response = match method.handler.call(request.params).await {
        Ok(result) => RpcResponse::success(result),
        Err(error) => {
            warn!(method = %request.method, error = %error, "Gateway method failed");
            RpcResponse::failure(error)
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Fallback: dispatch `(method, path)` pairs registered through the HTTP
/// route registry. Unknown pairs answer 404.
async fn registered_routes(State(state): State<GatewayState>, request: Request) -> Response {
    let method = request.method().as_str().to_uppercase();
    let path = request.uri().path().to_string();

    let Some(route) = state.kernel.http_routes().get(&method, &path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if route.requires_auth && !state.guard.check(request.headers()) {
        return unauthorized();
    }

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) if bytes.is_empty() => Value::Null,
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(RpcResponse::failure(GatewayError::new(
                        "INVALID_REQUEST",
                        e.to_string(),
                    ))),
                )
                    .into_response();
            },
        },
        Err(e) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(RpcResponse::failure(GatewayError::new(
                    "BODY_TOO_LARGE",
                    e.to_string(),
                ))),
            )
                .into_response();
        },
    };

    match route.handler.call(body).await {
        Ok(result) => (StatusCode::OK, Json(RpcResponse::success(result))).into_response(),
        Err(error) => {
            warn!(method = %method, path = %path, error = %error, "HTTP route failed");
            (StatusCode::OK, Json(RpcResponse::failure(error))).into_response()
        },
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(RpcResponse::failure(GatewayError::new(
            "UNAUTHORIZED",
            "missing or invalid bearer token",
        ))),
    )
        .into_response()
}
