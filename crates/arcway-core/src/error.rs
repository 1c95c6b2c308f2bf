//! Gateway-wide error taxonomy.
//!
//! Every fallible operation in the data plane — route matching, config
//! lookups, transformer compilation, hook execution, circuit breaking,
//! upstream calls, WebSocket pumps — reports through this one enum so the
//! HTTP layer has a single, stable mapping from failure to status code and
//! client-safe body.

use actix_web::HttpResponse;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("route not found: {path}")]
    RouteNotFound { path: String },

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("endpoint unavailable: {endpoint_id}")]
    EndpointUnavailable { endpoint_id: String },

    #[error("config lookup failed: {0}")]
    ConfigLookup(String),

    #[error("transformer {transformer_id} failed: {message}")]
    Transform {
        transformer_id: String,
        message: String,
    },

    #[error("hook failed for {endpoint_id}/{route_id}: {message}")]
    Hook {
        endpoint_id: String,
        route_id: String,
        message: String,
    },

    #[error("service unavailable: circuit breaker open")]
    CircuitOpen { endpoint_id: String },

    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
    },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("already registered: {0}")]
    AlreadyRegistered(String),
}

impl GatewayError {
    /// Machine-readable kind, used as the `error` field of the JSON body and
    /// as the event-bus `error` string.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation_error",
            GatewayError::RouteNotFound { .. } => "route_not_found",
            GatewayError::MethodNotAllowed { .. } => "method_not_allowed",
            GatewayError::EndpointUnavailable { .. } => "endpoint_unavailable",
            GatewayError::ConfigLookup(_) => "config_lookup_error",
            GatewayError::Transform { .. } => "transform_error",
            GatewayError::Hook { .. } => "hook_error",
            GatewayError::CircuitOpen { .. } => "circuit_open",
            GatewayError::Upstream { .. } => "upstream_error",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::WebSocket(_) => "websocket_error",
            GatewayError::AlreadyRegistered(_) => "already_registered",
        }
    }
}

impl actix_web::error::ResponseError for GatewayError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::EndpointUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ConfigLookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Transform { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Hook { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::WebSocket(_) => StatusCode::BAD_GATEWAY,
            GatewayError::AlreadyRegistered(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // CircuitOpenError carries a fixed, contract-mandated message regardless
        // of which endpoint tripped, so clients can match on it literally.
        let message = match self {
            GatewayError::CircuitOpen { .. } => {
                "service unavailable: circuit breaker open".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}
