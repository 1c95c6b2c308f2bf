//! Circuit breaker state shared between [`crate::breaker`]'s registry and
//! anything that needs to report breaker status (e.g. an admin surface).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Fixed trip policy, not operator-configurable per route.
#[derive(Debug, Clone, Copy)]
pub struct BreakerPolicy {
    pub min_requests: u32,
    pub failure_ratio: f64,
    pub window: std::time::Duration,
    pub open_timeout: std::time::Duration,
    pub half_open_max_requests: u32,
    pub half_open_success_threshold: u32,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            min_requests: 3,
            failure_ratio: 0.6,
            window: std::time::Duration::from_secs(5),
            open_timeout: std::time::Duration::from_secs(30),
            half_open_max_requests: 100,
            half_open_success_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    pub endpoint_id: String,
    pub state: CircuitState,
    pub requests: u64,
    pub failures: u64,
}
