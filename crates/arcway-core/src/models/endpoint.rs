//! The addressable-upstream entity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Https,
    Ws,
    Wss,
    Tcp,
    Udp,
}

impl Protocol {
    pub fn is_websocket(self) -> bool {
        matches!(self, Protocol::Ws | Protocol::Wss)
    }

    /// Scheme this protocol expects a `base_url` to carry.
    fn expected_scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Ws => "ws",
            Protocol::Wss => "wss",
            Protocol::Tcp | Protocol::Udp => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    None,
    Basic,
    Bearer,
    ApiKey,
    OAuth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub auth_type: AuthType,
    /// Opaque credential blob; interpretation depends on `auth_type` (e.g.
    /// `{"token": "..."}` for Bearer, `{"header": "X-Api-Key", "value": "..."}`
    /// for ApiKey).
    #[serde(default)]
    pub auth_config: Option<serde_json::Value>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub use_circuit_breaker: bool,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_true")]
    pub validate_ssl: bool,
    #[serde(default)]
    pub log_requests: bool,
    #[serde(default)]
    pub log_responses: bool,
    #[serde(default)]
    pub disabled: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Endpoint {
    /// Validates the `base_url`-vs-`protocol` invariant from the data model.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("endpoint name must not be empty".to_string());
        }
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| format!("endpoint {} has an invalid base_url: {e}", self.id))?;
        let expected = self.protocol.expected_scheme();
        if !expected.is_empty() && url.scheme() != expected {
            return Err(format!(
                "endpoint {} declares protocol {:?} but base_url scheme is {}",
                self.id,
                self.protocol,
                url.scheme()
            ));
        }
        Ok(())
    }

    /// Injects credentials into the outbound header map per `auth_type`.
    /// Hooks that cannot resolve `auth_config` degrade gracefully (no-op)
    /// rather than aborting the request, matching the service-locator
    /// degrade-gracefully contract for external collaborators.
    pub fn apply_auth(&self, headers: &mut actix_web::http::header::HeaderMap) {
        use actix_web::http::header::{HeaderName, HeaderValue};

        let Some(config) = &self.auth_config else {
            return;
        };
        match self.auth_type {
            AuthType::None => {}
            AuthType::Basic => {
                if let (Some(user), Some(pass)) = (
                    config.get("username").and_then(|v| v.as_str()),
                    config.get("password").and_then(|v| v.as_str()),
                ) {
                    let encoded =
                        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, format!("{user}:{pass}"));
                    if let Ok(value) = HeaderValue::from_str(&format!("Basic {encoded}")) {
                        headers.insert(actix_web::http::header::AUTHORIZATION, value);
                    }
                }
            }
            AuthType::Bearer => {
                if let Some(token) = config.get("token").and_then(|v| v.as_str()) {
                    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                        headers.insert(actix_web::http::header::AUTHORIZATION, value);
                    }
                }
            }
            AuthType::ApiKey => {
                if let (Some(name), Some(value)) = (
                    config.get("header").and_then(|v| v.as_str()),
                    config.get("value").and_then(|v| v.as_str()),
                ) {
                    if let (Ok(name), Ok(value)) =
                        (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
                    {
                        headers.insert(name, value);
                    }
                }
            }
            AuthType::OAuth => {
                if let Some(token) = config.get("access_token").and_then(|v| v.as_str()) {
                    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                        headers.insert(actix_web::http::header::AUTHORIZATION, value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(base_url: &str, protocol: Protocol) -> Endpoint {
        Endpoint {
            id: "e1".into(),
            name: "upstream".into(),
            base_url: base_url.into(),
            protocol,
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
    fn validates_matching_scheme() {
        assert!(sample("http://up/", Protocol::Http).validate().is_ok());
        assert!(sample("wss://up/", Protocol::Wss).validate().is_ok());
    }

    #[test]
    fn rejects_mismatched_scheme() {
        assert!(sample("https://up/", Protocol::Http).validate().is_err());
    }
}
