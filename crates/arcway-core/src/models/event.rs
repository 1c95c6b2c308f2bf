//! Typed records published on the [`crate::events`] bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyEventName {
    RequestReceived,
    RequestPreprocessed,
    RequestTransformed,
    RequestSent,
    RequestError,
    ResponseReceived,
    ResponseTransformed,
    ResponsePostprocessed,
    ResponseSent,
    ResponseError,
    CircuitBreakerTripped,
    CircuitBreakerReset,
}

impl ProxyEventName {
    /// The dotted topic name for this event (`proxy.request.received`, …).
    pub fn topic(self) -> &'static str {
        match self {
            ProxyEventName::RequestReceived => "proxy.request.received",
            ProxyEventName::RequestPreprocessed => "proxy.request.preprocessed",
            ProxyEventName::RequestTransformed => "proxy.request.transformed",
            ProxyEventName::RequestSent => "proxy.request.sent",
            ProxyEventName::RequestError => "proxy.request.error",
            ProxyEventName::ResponseReceived => "proxy.response.received",
            ProxyEventName::ResponseTransformed => "proxy.response.transformed",
            ProxyEventName::ResponsePostprocessed => "proxy.response.postprocessed",
            ProxyEventName::ResponseSent => "proxy.response.sent",
            ProxyEventName::ResponseError => "proxy.response.error",
            ProxyEventName::CircuitBreakerTripped => "proxy.circuit_breaker.tripped",
            ProxyEventName::CircuitBreakerReset => "proxy.circuit_breaker.reset",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyEvent {
    pub name: ProxyEventName,
    pub timestamp: DateTime<Utc>,
    pub endpoint_id: String,
    pub endpoint_url: String,
    pub route_id: String,
    pub route_path: String,
    pub method: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProxyEvent {
    pub fn new(name: ProxyEventName, endpoint_id: &str, endpoint_url: &str, route_id: &str, route_path: &str, method: &str) -> Self {
        Self {
            name,
            timestamp: Utc::now(),
            endpoint_id: endpoint_id.to_string(),
            endpoint_url: endpoint_url.to_string(),
            route_id: route_id.to_string(),
            route_path: route_path.to_string(),
            method: method.to_string(),
            status_code: None,
            duration_ms: None,
            error: None,
            metadata: HashMap::new(),
        }
    }
}

/// Configuration-change events that invalidate derived structures (breakers,
/// compiled transformers, the route index) in the Config Store's subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEventName {
    EndpointUpdated,
    RouteUpdated,
    TransformerUpdated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEvent {
    pub name: ConfigEventName,
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
}
