//! The append-only audit record written by the [`crate::logs::sink`] Log Sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;
pub const TRUNCATION_MARKER: &str = "... [truncated]";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyLog {
    pub id: String,
    pub endpoint_id: String,
    pub route_id: String,
    pub request_method: String,
    pub request_path: String,
    pub request_headers: HashMap<String, String>,
    pub request_body: String,
    pub status_code: Option<u16>,
    pub response_headers: HashMap<String, String>,
    pub response_body: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub client_ip: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Headers that must never survive into a persisted log record.
const SCRUBBED_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

impl ProxyLog {
    /// Scrubs sensitive headers and truncates both bodies in place.
    pub fn sanitize(&mut self) {
        for header in SCRUBBED_HEADERS {
            self.request_headers.retain(|k, _| !k.eq_ignore_ascii_case(header));
            self.response_headers.retain(|k, _| !k.eq_ignore_ascii_case(header));
        }
        truncate_body(&mut self.request_body);
        truncate_body(&mut self.response_body);
    }
}

fn truncate_body(body: &mut String) {
    if body.len() > MAX_BODY_BYTES {
        let mut cut = MAX_BODY_BYTES;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str(TRUNCATION_MARKER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_log() -> ProxyLog {
        ProxyLog {
            id: "l1".into(),
            endpoint_id: "e1".into(),
            route_id: "r1".into(),
            request_method: "GET".into(),
            request_path: "/x".into(),
            request_headers: HashMap::new(),
            request_body: String::new(),
            status_code: Some(200),
            response_headers: HashMap::new(),
            response_body: String::new(),
            duration_ms: 1,
            error: None,
            client_ip: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn scrubs_sensitive_headers() {
        let mut log = blank_log();
        log.request_headers.insert("Authorization".into(), "Bearer x".into());
        log.request_headers.insert("Cookie".into(), "s=1".into());
        log.response_headers.insert("Set-Cookie".into(), "s=1".into());
        log.sanitize();
        assert!(log.request_headers.is_empty());
        assert!(log.response_headers.is_empty());
    }

    #[test]
    fn truncates_oversized_body() {
        let mut log = blank_log();
        log.request_body = "a".repeat(MAX_BODY_BYTES + 1024);
        log.sanitize();
        assert_eq!(log.request_body.len(), MAX_BODY_BYTES + TRUNCATION_MARKER.len());
        assert!(log.request_body.ends_with(TRUNCATION_MARKER));
    }
}
