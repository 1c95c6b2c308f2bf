//! The HTTP Forwarder: the linear request/response pipeline described in
//! the component design — route match, transform, hook, send, transform,
//! hook, respond, log.

use crate::breaker::{CircuitBreakerError, CircuitBreakerRegistry};
use crate::config::bootstrap::HttpClientSettings;
use crate::config::store::ConfigStore;
use crate::engine::TransformerEngine;
use crate::error::GatewayError;
use crate::events::EventBus;
use crate::logs::sink::LogSink;
use crate::matcher::{RouteMatch, RouteMatchError, RouteMatcher};
use crate::models::event::{ProxyEvent, ProxyEventName};
use crate::models::log::ProxyLog;
use crate::models::route::Route;
use crate::processor::Processor;
use actix_web::http::header::{HeaderMap as ActixHeaderMap, HeaderValue as ActixHeaderValue};
use actix_web::http::{Method as ActixMethod, StatusCode};
use actix_web::HttpResponse;
use chrono::Utc;
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap as ReqwestHeaderMap, HeaderName, HeaderValue},
    Client, Method as ReqwestMethod,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::timeout;
use uuid::Uuid;

const SKIP_HEADERS: &[&str] = &["host", "connection", "upgrade", "proxy-connection"];
const RETRYABLE_STATUS: [u16; 3] = [502, 503, 504];

pub struct Forwarder {
    client: Client,
    config_store: Arc<dyn ConfigStore>,
    matcher: RwLock<Arc<RouteMatcher>>,
    breakers: Arc<CircuitBreakerRegistry>,
    processor: Arc<Processor<Vec<u8>>>,
    engine: Arc<TransformerEngine>,
    events: Arc<EventBus>,
    log_sink: Arc<LogSink>,
}

impl Forwarder {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        breakers: Arc<CircuitBreakerRegistry>,
        processor: Arc<Processor<Vec<u8>>>,
        engine: Arc<TransformerEngine>,
        events: Arc<EventBus>,
        log_sink: Arc<LogSink>,
        http_client: &HttpClientSettings,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .pool_max_idle_per_host(http_client.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(http_client.idle_timeout_seconds))
            .build()
            .map_err(|e| GatewayError::ConfigLookup(format!("failed to build HTTP client: {e}")))?;

        let routes = config_store.list_active_routes()?;
        let matcher = RouteMatcher::new(routes).map_err(|e| GatewayError::ConfigLookup(e.to_string()))?;

        Ok(Self {
            client,
            config_store,
            matcher: RwLock::new(Arc::new(matcher)),
            breakers,
            processor,
            engine,
            events,
            log_sink,
        })
    }

    /// Rebuilds the route index from the Config Store. Called when a
    /// `route.updated` configuration event is observed.
    pub async fn refresh_routes(&self) -> Result<(), GatewayError> {
        let routes = self.config_store.list_active_routes()?;
        let matcher = RouteMatcher::new(routes).map_err(|e| GatewayError::ConfigLookup(e.to_string()))?;
        *self.matcher.write().await = Arc::new(matcher);
        Ok(())
    }

    /// Resolves `path`/`method` to a route and its substituted target path,
    /// without forwarding anything. Used by the `/ws/*` surface, which hands
    /// the match off to the Bridge instead of calling `handle`.
    pub async fn match_route(&self, path: &str, method: &str) -> Result<(Route, String), GatewayError> {
        let matcher = self.matcher.read().await;
        let RouteMatch { route, params } = matcher.find_match(path, method).map_err(|e| match e {
            RouteMatchError::NotFound { path, .. } => GatewayError::RouteNotFound { path },
            other => GatewayError::ConfigLookup(other.to_string()),
        })?;
        let target_path = substitute_params(&route.target_path, &params);
        Ok((route, target_path))
    }

    pub async fn handle(
        &self,
        method: &ActixMethod,
        path: &str,
        headers: &ActixHeaderMap,
        body: Vec<u8>,
        client_ip: Option<String>,
    ) -> Result<HttpResponse, GatewayError> {
        let started_at = Instant::now();

        let route_match = {
            let matcher = self.matcher.read().await;
            matcher.find_match(path, method.as_str()).map_err(|e| match e {
                RouteMatchError::NotFound { path, .. } => GatewayError::RouteNotFound { path },
                other => GatewayError::ConfigLookup(other.to_string()),
            })?
        };
        let RouteMatch { route, params } = route_match;

        let endpoint = self
            .config_store
            .get_endpoint_by_id(&route.endpoint_id)?
            .filter(|e| !e.disabled)
            .ok_or_else(|| GatewayError::EndpointUnavailable {
                endpoint_id: route.endpoint_id.clone(),
            })?;

        self.events.publish(ProxyEvent::new(
            ProxyEventName::RequestReceived,
            &endpoint.id,
            &endpoint.base_url,
            &route.id,
            path,
            method.as_str(),
        ));

        let target_path = substitute_params(&route.target_path, &params);
        let target_url = join_url(&endpoint.base_url, &target_path);

        let mut outbound_headers = build_outbound_headers(headers, route.strip_auth_header);
        apply_endpoint_auth(&endpoint, &mut outbound_headers);

        let mut request_body = body;
        if let Some(transformer_id) = &route.input_transformer_id {
            request_body = self.engine.run(transformer_id, &request_body).await?;
            self.events.publish(ProxyEvent::new(
                ProxyEventName::RequestTransformed,
                &endpoint.id,
                &endpoint.base_url,
                &route.id,
                path,
                method.as_str(),
            ));
        }

        let pre_body = self.processor.pre(&endpoint.id, &route.id, request_body.clone()).await?;
        if pre_body != request_body {
            self.events.publish(ProxyEvent::new(
                ProxyEventName::RequestPreprocessed,
                &endpoint.id,
                &endpoint.base_url,
                &route.id,
                path,
                method.as_str(),
            ));
        }
        request_body = pre_body;

        self.events.publish(ProxyEvent::new(
            ProxyEventName::RequestSent,
            &endpoint.id,
            &endpoint.base_url,
            &route.id,
            path,
            method.as_str(),
        ));

        let reqwest_method = to_reqwest_method(method);
        let timeout_duration = Duration::from_millis(endpoint.timeout_ms);

        let send_once = {
            let client = self.client.clone();
            let target_url = target_url.clone();
            let reqwest_method = reqwest_method.clone();
            let outbound_headers = outbound_headers.clone();
            let request_body = request_body.clone();
            move || {
                let client = client.clone();
                let target_url = target_url.clone();
                let reqwest_method = reqwest_method.clone();
                let outbound_headers = outbound_headers.clone();
                let request_body = request_body.clone();
                async move {
                    let built = client
                        .request(reqwest_method, &target_url)
                        .headers(outbound_headers)
                        .body(request_body);
                    match timeout(timeout_duration, built.send()).await {
                        Ok(Ok(response)) => Ok(response),
                        Ok(Err(e)) => Err(GatewayError::Upstream {
                            message: e.to_string(),
                            status: None,
                        }),
                        Err(_) => Err(GatewayError::Timeout {
                            timeout_ms: timeout_duration.as_millis() as u64,
                        }),
                    }
                }
            }
        };

        let mut attempt = 0u32;
        let response = loop {
            let outcome = if endpoint.use_circuit_breaker {
                let breaker = self.breakers.get_or_create(&endpoint.id).await;
                breaker.call(&self.events, send_once.clone()).await.map_err(|e| match e {
                    CircuitBreakerError::Open => GatewayError::CircuitOpen {
                        endpoint_id: endpoint.id.clone(),
                    },
                    CircuitBreakerError::OperationFailed(inner) => inner,
                })
            } else {
                send_once.clone()().await
            };

            match outcome {
                Ok(response) if attempt < endpoint.retry_count && RETRYABLE_STATUS.contains(&response.status().as_u16()) => {
                    attempt += 1;
                    backoff(attempt).await;
                    continue;
                }
                Ok(response) => break Ok(response),
                Err(GatewayError::CircuitOpen { .. }) => {
                    self.events.publish(error_event(&endpoint, &route, path, method, "circuit breaker open"));
                    return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                        "error": "circuit_open",
                        "message": "service unavailable: circuit breaker open",
                    })));
                }
                Err(err) if attempt < endpoint.retry_count && matches!(err, GatewayError::Upstream { .. } | GatewayError::Timeout { .. }) => {
                    attempt += 1;
                    warn!("retrying request to {target_url} after error: {err}");
                    backoff(attempt).await;
                    continue;
                }
                Err(err) => break Err(err),
            }
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.events.publish(error_event(&endpoint, &route, path, method, &err.to_string()));
                if endpoint.log_requests || endpoint.log_responses {
                    let log = build_log(
                        &route, &endpoint, method, path, headers, &request_body, None, &HashMap::new(), "",
                        started_at, client_ip, Some(err.to_string()),
                    );
                    let _ = self.log_sink.create(log).await;
                }
                return Err(err);
            }
        };

        self.events.publish(ProxyEvent::new(
            ProxyEventName::ResponseReceived,
            &endpoint.id,
            &endpoint.base_url,
            &route.id,
            path,
            method.as_str(),
        ));

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let mut response_body = response.bytes().await.map_err(|e| GatewayError::Upstream {
            message: e.to_string(),
            status: Some(status),
        })?.to_vec();

        if let Some(transformer_id) = &route.output_transformer_id {
            response_body = self.engine.run(transformer_id, &response_body).await?;
            self.events.publish(ProxyEvent::new(
                ProxyEventName::ResponseTransformed,
                &endpoint.id,
                &endpoint.base_url,
                &route.id,
                path,
                method.as_str(),
            ));
        }

        let post_body = self.processor.post(&endpoint.id, &route.id, response_body.clone()).await?;
        if post_body != response_body {
            self.events.publish(ProxyEvent::new(
                ProxyEventName::ResponsePostprocessed,
                &endpoint.id,
                &endpoint.base_url,
                &route.id,
                path,
                method.as_str(),
            ));
        }
        response_body = post_body;

        let mut builder = HttpResponse::build(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY));
        for (name, value) in response_headers.iter() {
            if name.as_str().eq_ignore_ascii_case("connection") {
                continue;
            }
            if let Ok(value) = ActixHeaderValue::from_bytes(value.as_bytes()) {
                builder.insert_header((name.as_str(), value));
            }
        }

        self.events.publish(ProxyEvent::new(
            ProxyEventName::ResponseSent,
            &endpoint.id,
            &endpoint.base_url,
            &route.id,
            path,
            method.as_str(),
        ));

        if endpoint.log_requests || endpoint.log_responses {
            let response_header_map: HashMap<String, String> = response_headers
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
                .collect();
            let log = build_log(
                &route,
                &endpoint,
                method,
                path,
                headers,
                &request_body,
                Some(status),
                &response_header_map,
                &String::from_utf8_lossy(&response_body),
                started_at,
                client_ip,
                None,
            );
            let _ = self.log_sink.create(log).await;
        }

        debug!("forwarded {} {} -> {} in {:?}", method, path, target_url, started_at.elapsed());
        Ok(builder.body(response_body))
    }
}

fn error_event(endpoint: &crate::models::endpoint::Endpoint, route: &Route, path: &str, method: &ActixMethod, message: &str) -> ProxyEvent {
    let mut event = ProxyEvent::new(
        ProxyEventName::RequestError,
        &endpoint.id,
        &endpoint.base_url,
        &route.id,
        path,
        method.as_str(),
    );
    event.error = Some(message.to_string());
    event
}

#[allow(clippy::too_many_arguments)]
fn build_log(
    route: &Route,
    endpoint: &crate::models::endpoint::Endpoint,
    method: &ActixMethod,
    path: &str,
    headers: &ActixHeaderMap,
    request_body: &[u8],
    status_code: Option<u16>,
    response_headers: &HashMap<String, String>,
    response_body: &str,
    started_at: Instant,
    client_ip: Option<String>,
    error: Option<String>,
) -> ProxyLog {
    let request_headers = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    ProxyLog {
        id: Uuid::new_v4().to_string(),
        endpoint_id: endpoint.id.clone(),
        route_id: route.id.clone(),
        request_method: method.to_string(),
        request_path: path.to_string(),
        request_headers,
        request_body: String::from_utf8_lossy(request_body).into_owned(),
        status_code,
        response_headers: response_headers.clone(),
        response_body: response_body.to_string(),
        duration_ms: started_at.elapsed().as_millis() as u64,
        error,
        client_ip,
        user_id: None,
        created_at: Utc::now(),
    }
}

async fn backoff(attempt: u32) {
    let ms = (50u64 * 2u64.saturating_pow(attempt)).min(2000);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn to_reqwest_method(method: &ActixMethod) -> ReqwestMethod {
    ReqwestMethod::from_bytes(method.as_str().as_bytes()).unwrap_or(ReqwestMethod::GET)
}

pub(crate) fn substitute_params(target_path: &str, params: &[(String, String)]) -> String {
    let lookup: HashMap<&str, &str> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    target_path
        .split('/')
        .map(|segment| {
            if segment == "*" {
                lookup.get("*").copied().unwrap_or("").to_string()
            } else if let Some(name) = segment.strip_prefix(':') {
                lookup.get(name).copied().unwrap_or("").to_string()
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn join_url(base_url: &str, target_path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), target_path.trim_start_matches('/'))
}

fn build_outbound_headers(headers: &ActixHeaderMap, strip_auth_header: bool) -> ReqwestHeaderMap {
    let mut out = ReqwestHeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let lower = name.as_str().to_lowercase();
        if SKIP_HEADERS.iter().any(|skip| lower.starts_with(skip)) {
            continue;
        }
        if strip_auth_header && (lower == "authorization" || lower == "cookie") {
            continue;
        }
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_ref()), HeaderValue::from_bytes(value.as_bytes())) {
            out.insert(name, value);
        }
    }
    out.entry("user-agent").or_insert_with(|| HeaderValue::from_static("arcway-gateway"));
    out
}

/// `Endpoint::apply_auth` is written against `actix_web`'s header map since
/// it's shared with the inbound side; bridge the outbound `reqwest` map
/// through a scratch actix map so the same auth-injection logic serves both.
fn apply_endpoint_auth(endpoint: &crate::models::endpoint::Endpoint, headers: &mut ReqwestHeaderMap) {
    let mut scratch = ActixHeaderMap::new();
    endpoint.apply_auth(&mut scratch);
    for (name, value) in scratch.iter() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.insert(name, value);
        }
    }
}
