//! The audit Log Sink: persists [`crate::models::log::ProxyLog`] records,
//! scrubbing sensitive headers and truncating oversized bodies before the
//! record ever lands in the store.

use crate::error::GatewayError;
use crate::models::log::ProxyLog;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// In-memory, capped, oldest-evicted audit log. Swappable for a persistent
/// implementation without touching the Forwarder or Bridge, which only
/// depend on `create`.
pub struct LogSink {
    rows: RwLock<VecDeque<ProxyLog>>,
    capacity: usize,
}

impl LogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: RwLock::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
        }
    }

    /// Sanitizes and persists `log`, evicting the oldest row if at capacity.
    pub async fn create(&self, mut log: ProxyLog) -> Result<(), GatewayError> {
        log.sanitize();
        let mut rows = self.rows.write().await;
        if rows.len() >= self.capacity {
            rows.pop_front();
        }
        rows.push_back(log);
        Ok(())
    }

    /// Deletes records strictly older than `days * 24h`.
    pub async fn delete_older_than(&self, days: i64) -> Result<usize, GatewayError> {
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.created_at >= cutoff);
        Ok(before - rows.len())
    }

    pub async fn list(&self) -> Vec<ProxyLog> {
        self.rows.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn blank_log(id: &str) -> ProxyLog {
        ProxyLog {
            id: id.into(),
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

    #[tokio::test]
    async fn scrubs_headers_on_create() {
        let sink = LogSink::new(10);
        let mut log = blank_log("l1");
        log.request_headers.insert("Authorization".into(), "Bearer x".into());
        sink.create(log).await.unwrap();
        let rows = sink.list().await;
        assert!(rows[0].request_headers.is_empty());
    }

    #[tokio::test]
    async fn evicts_oldest_past_capacity() {
        let sink = LogSink::new(2);
        sink.create(blank_log("l1")).await.unwrap();
        sink.create(blank_log("l2")).await.unwrap();
        sink.create(blank_log("l3")).await.unwrap();
        let rows = sink.list().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "l2");
    }

    #[tokio::test]
    async fn delete_older_than_removes_nothing_when_all_recent() {
        let sink = LogSink::new(10);
        sink.create(blank_log("l1")).await.unwrap();
        let removed = sink.delete_older_than(30).await.unwrap();
        assert_eq!(removed, 0);
    }
}
