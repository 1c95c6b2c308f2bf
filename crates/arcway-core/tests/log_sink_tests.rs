//! Coverage of the Log Sink's capacity eviction and age-based retention,
//! which the per-record sanitize/truncate unit tests in `models::log`
//! don't exercise.

use arcway_core::logs::sink::LogSink;
use arcway_core::models::log::ProxyLog;
use chrono::{Duration, Utc};
use std::collections::HashMap;

fn log(id: &str, created_at: chrono::DateTime<Utc>) -> ProxyLog {
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
        created_at,
    }
}

#[tokio::test]
async fn evicts_oldest_row_once_at_capacity() {
    let sink = LogSink::new(2);
    sink.create(log("l1", Utc::now())).await.unwrap();
    sink.create(log("l2", Utc::now())).await.unwrap();
    sink.create(log("l3", Utc::now())).await.unwrap();

    let rows = sink.list().await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.id != "l1"));
}

#[tokio::test]
async fn deletes_records_older_than_retention_window() {
    let sink = LogSink::new(100);
    sink.create(log("old", Utc::now() - Duration::days(10))).await.unwrap();
    sink.create(log("new", Utc::now())).await.unwrap();

    let deleted = sink.delete_older_than(5).await.unwrap();
    assert_eq!(deleted, 1);
    let rows = sink.list().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "new");
}

#[tokio::test]
async fn scrubs_authorization_header_on_create() {
    let sink = LogSink::new(10);
    let mut entry = log("l1", Utc::now());
    entry.request_headers.insert("Authorization".into(), "Bearer secret".into());
    sink.create(entry).await.unwrap();

    let rows = sink.list().await;
    assert!(!rows[0].request_headers.contains_key("Authorization"));
}
