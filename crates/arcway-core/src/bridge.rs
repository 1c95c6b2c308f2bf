//! The WebSocket Bridge: upgrades an inbound connection, dials the matching
//! upstream, and pumps messages bidirectionally through the Transformer
//! Engine.

use crate::config::store::ConfigStore;
use crate::engine::TransformerEngine;
use crate::error::GatewayError;
use crate::models::endpoint::Endpoint;
use crate::models::route::Route;
use actix_web::{web, Error as ActixError, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TungsteniteMessage};

/// Transformer-error policy for WebSocket pumps: `lenient` drops the
/// offending message and keeps the socket open; `strict` closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformErrorPolicy {
    #[default]
    Lenient,
    Strict,
}

/// Tracks active upstream sockets per endpoint id, purely for observability
/// (admin surfaces can report live connection counts per endpoint).
#[derive(Default)]
pub struct ActiveSocketRegistry {
    by_endpoint: RwLock<std::collections::HashMap<String, HashSet<String>>>,
}

impl ActiveSocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn register(&self, endpoint_id: &str, connection_id: &str) {
        self.by_endpoint
            .write()
            .await
            .entry(endpoint_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    async fn remove(&self, endpoint_id: &str, connection_id: &str) {
        if let Some(set) = self.by_endpoint.write().await.get_mut(endpoint_id) {
            set.remove(connection_id);
        }
    }

    pub async fn count_for(&self, endpoint_id: &str) -> usize {
        self.by_endpoint.read().await.get(endpoint_id).map(HashSet::len).unwrap_or(0)
    }
}

pub struct Bridge {
    config_store: Arc<dyn ConfigStore>,
    engine: Arc<TransformerEngine>,
    active_sockets: Arc<ActiveSocketRegistry>,
    error_policy: TransformErrorPolicy,
}

impl Bridge {
    pub fn new(config_store: Arc<dyn ConfigStore>, engine: Arc<TransformerEngine>, active_sockets: Arc<ActiveSocketRegistry>) -> Self {
        Self {
            config_store,
            engine,
            active_sockets,
            error_policy: TransformErrorPolicy::default(),
        }
    }

    pub async fn handle(
        &self,
        req: HttpRequest,
        stream: web::Payload,
        route: &Route,
        target_path: &str,
    ) -> Result<HttpResponse, ActixError> {
        let endpoint = match self.config_store.get_endpoint_by_id(&route.endpoint_id) {
            Ok(Some(e)) if !e.disabled => e,
            _ => return Ok(HttpResponse::ServiceUnavailable().finish()),
        };

        let upstream_url = match build_upstream_url(&endpoint, target_path) {
            Ok(url) => url,
            Err(e) => {
                error!("failed to build websocket upstream URL: {e}");
                return Ok(HttpResponse::BadGateway().finish());
            }
        };

        let (response, mut client_session, mut client_msg_stream) = actix_ws::handle(&req, stream)?;

        let (upstream_ws, _) = match connect_async(&upstream_url).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to connect to websocket upstream {upstream_url}: {e}");
                let _ = client_session
                    .close(Some(actix_ws::CloseReason {
                        code: actix_ws::CloseCode::Error,
                        description: Some(format!("upstream connection failed: {e}")),
                    }))
                    .await;
                return Ok(HttpResponse::BadGateway().finish());
            }
        };

        let (mut upstream_write, mut upstream_read) = upstream_ws.split();
        let connection_id = uuid::Uuid::new_v4().to_string();
        self.active_sockets.register(&endpoint.id, &connection_id).await;

        let input_transformer_id = route.input_transformer_id.clone();
        let output_transformer_id = route.output_transformer_id.clone();
        let engine_for_client = self.engine.clone();
        let engine_for_upstream = self.engine.clone();
        let policy = self.error_policy;

        let mut client_session_for_read = client_session.clone();
        let client_to_upstream = async move {
            while let Some(Ok(msg)) = client_msg_stream.next().await {
                let outcome = match msg {
                    Message::Text(text) => {
                        let payload = transform_or_pass(&engine_for_client, &input_transformer_id, text.as_bytes(), policy).await;
                        payload.map(|bytes| Some(TungsteniteMessage::Text(String::from_utf8_lossy(&bytes).into_owned())))
                    }
                    Message::Binary(bin) => {
                        let payload = transform_or_pass(&engine_for_client, &input_transformer_id, &bin, policy).await;
                        payload.map(|bytes| Some(TungsteniteMessage::Binary(bytes)))
                    }
                    Message::Ping(bytes) => Ok(Some(TungsteniteMessage::Ping(bytes.to_vec()))),
                    Message::Pong(bytes) => Ok(Some(TungsteniteMessage::Pong(bytes.to_vec()))),
                    Message::Close(reason) => {
                        info!("client closed websocket: {reason:?}");
                        let _ = upstream_write.close().await;
                        break;
                    }
                    _ => Ok(None),
                };

                match outcome {
                    Ok(Some(forward)) => {
                        if let Err(e) = upstream_write.send(forward).await {
                            error!("failed to forward client message upstream: {e}");
                            let _ = client_session_for_read.close(None).await;
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(dropped) => {
                        warn!("dropped client->upstream message: {dropped}");
                        if policy == TransformErrorPolicy::Strict {
                            let _ = upstream_write.close().await;
                            let _ = client_session_for_read.close(None).await;
                            break;
                        }
                    }
                }
            }
        };

        let upstream_to_client = async move {
            while let Some(result) = upstream_read.next().await {
                match result {
                    Ok(TungsteniteMessage::Text(text)) => {
                        match transform_or_pass(&engine_for_upstream, &output_transformer_id, text.as_bytes(), policy).await {
                            Ok(bytes) => {
                                if client_session.text(String::from_utf8_lossy(&bytes).into_owned()).await.is_err() {
                                    break;
                                }
                            }
                            Err(dropped) => {
                                warn!("dropped upstream->client message: {dropped}");
                                if policy == TransformErrorPolicy::Strict {
                                    let _ = client_session.close(None).await;
                                    break;
                                }
                            }
                        }
                    }
                    Ok(TungsteniteMessage::Binary(bin)) => {
                        match transform_or_pass(&engine_for_upstream, &output_transformer_id, &bin, policy).await {
                            Ok(bytes) => {
                                if client_session.binary(bytes).await.is_err() {
                                    break;
                                }
                            }
                            Err(dropped) => {
                                warn!("dropped upstream->client message: {dropped}");
                                if policy == TransformErrorPolicy::Strict {
                                    let _ = client_session.close(None).await;
                                    break;
                                }
                            }
                        }
                    }
                    Ok(TungsteniteMessage::Ping(bytes)) => {
                        if client_session.ping(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(TungsteniteMessage::Pong(bytes)) => {
                        if client_session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(TungsteniteMessage::Close(_)) => {
                        let _ = client_session.close(None).await;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("error receiving from websocket upstream: {e}");
                        let _ = client_session.close(None).await;
                        break;
                    }
                }
            }
        };

        let active_sockets = self.active_sockets.clone();
        let endpoint_id = endpoint.id.clone();
        actix_web::rt::spawn(async move {
            tokio::join!(client_to_upstream, upstream_to_client);
            active_sockets.remove(&endpoint_id, &connection_id).await;
            debug!("websocket bridge for endpoint {endpoint_id} torn down");
        });

        Ok(response)
    }
}

async fn transform_or_pass(
    engine: &TransformerEngine,
    transformer_id: &Option<String>,
    payload: &[u8],
    _policy: TransformErrorPolicy,
) -> Result<Vec<u8>, GatewayError> {
    match transformer_id {
        Some(id) => engine.run(id, payload).await,
        None => Ok(payload.to_vec()),
    }
}

fn build_upstream_url(endpoint: &Endpoint, target_path: &str) -> Result<String, GatewayError> {
    let scheme = if endpoint.base_url.starts_with("https://") || endpoint.base_url.starts_with("wss://") {
        "wss"
    } else {
        "ws"
    };
    let without_scheme = endpoint
        .base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("wss://")
        .trim_start_matches("ws://")
        .trim_end_matches('/');
    Ok(format!("{scheme}://{without_scheme}/{}", target_path.trim_start_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::endpoint::{AuthType, Protocol};

    fn endpoint(base_url: &str) -> Endpoint {
        Endpoint {
            id: "e1".into(),
            name: "up".into(),
            base_url: base_url.into(),
            protocol: Protocol::Ws,
            auth_type: AuthType::None,
            auth_config: None,
            timeout_ms: 1000,
            use_circuit_breaker: false,
            retry_count: 0,
            validate_ssl: true,
            log_requests: false,
            log_responses: false,
            disabled: false,
        }
    }

    #[test]
    fn rewrites_http_scheme_to_ws() {
        let url = build_upstream_url(&endpoint("http://up:8080"), "/socket").unwrap();
        assert_eq!(url, "ws://up:8080/socket");
    }

    #[test]
    fn rewrites_https_scheme_to_wss() {
        let url = build_upstream_url(&endpoint("https://up"), "/socket").unwrap();
        assert_eq!(url, "wss://up/socket");
    }

    #[tokio::test]
    async fn active_socket_registry_tracks_counts() {
        let registry = ActiveSocketRegistry::new();
        registry.register("e1", "c1").await;
        registry.register("e1", "c2").await;
        assert_eq!(registry.count_for("e1").await, 2);
        registry.remove("e1", "c1").await;
        assert_eq!(registry.count_for("e1").await, 1);
    }
}
