//! The Circuit Breaker Registry: one breaker per endpoint, trip policy fixed
//! by the contract rather than operator-configurable (contrast the
//! teacher's per-route `CircuitBreakerConfig`).
//!
//! Policy: trip when `requests >= 3` in the current 5s counting window and
//! `failures / requests >= 0.6`; open for 30s; half-open admits up to
//! `max_requests` concurrent probes and closes again after
//! `half_open_success_threshold` consecutive successes, reopening on any
//! half-open failure.

use crate::events::EventBus;
use crate::models::circuit_breaker::{BreakerPolicy, CircuitBreakerSnapshot, CircuitState};
use crate::models::event::{ProxyEvent, ProxyEventName};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Errors raised by [`CircuitBreaker::call`].
///
/// # Examples
///
/// ```
/// use arcway_core::breaker::CircuitBreakerError;
///
/// fn describe<E: std::fmt::Display>(err: &CircuitBreakerError<E>) -> &'static str {
///     match err {
///         CircuitBreakerError::Open => "circuit open",
///         CircuitBreakerError::OperationFailed(_) => "operation failed",
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker is open (or past its half-open admission limit) and the
    /// call was rejected without running.
    #[error("service unavailable: circuit breaker open")]
    Open,
    /// The call ran and the wrapped operation returned an error.
    #[error("operation failed: {0}")]
    OperationFailed(E),
}

/// Per-endpoint breaker tracking a rolling request/failure window and the
/// open/half-open/closed state machine described at module level.
#[derive(Debug)]
pub struct CircuitBreaker {
    endpoint_id: String,
    policy: BreakerPolicy,
    state: AtomicU8,
    window_start: RwLock<Instant>,
    requests: AtomicU64,
    failures: AtomicU64,
    opened_at: RwLock<Option<Instant>>,
    half_open_inflight: AtomicU32,
    half_open_successes: AtomicU64,
}

impl CircuitBreaker {
    fn new(endpoint_id: String, policy: BreakerPolicy) -> Self {
        Self {
            endpoint_id,
            policy,
            state: AtomicU8::new(CircuitState::Closed as u8),
            window_start: RwLock::new(Instant::now()),
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            opened_at: RwLock::new(None),
            half_open_inflight: AtomicU32::new(0),
            half_open_successes: AtomicU64::new(0),
        }
    }

    fn state(&self) -> CircuitState {
        match self.state.load(Ordering::Acquire) {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    fn set_state(&self, state: CircuitState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// A point-in-time view of this breaker's state and counters, suitable
    /// for exposing over an admin/observability surface.
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        CircuitBreakerSnapshot {
            endpoint_id: self.endpoint_id.clone(),
            state: self.state(),
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Admits the call, returning `Err(Open)` without touching `op` when the
    /// breaker should fail fast; otherwise runs `op` and records the outcome.
    pub async fn call<F, Fut, T, E>(&self, events: &EventBus, op: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.admit(events).await {
            debug!("circuit breaker for {} is open, failing fast", self.endpoint_id);
            return Err(CircuitBreakerError::Open);
        }

        match op().await {
            Ok(value) => {
                self.on_success(events).await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure(events).await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    /// Returns whether this call should proceed, performing the
    /// open -> half-open transition and half-open admission gate.
    async fn admit(&self, _events: &EventBus) -> bool {
        match self.state() {
            CircuitState::Closed => {
                self.maybe_roll_window().await;
                self.requests.fetch_add(1, Ordering::Relaxed);
                true
            }
            CircuitState::Open => {
                let elapsed = self.opened_at.read().await.map(|t| t.elapsed());
                if elapsed.map(|e| e >= self.policy.open_timeout).unwrap_or(false) {
                    self.transition_to_half_open();
                    info!("circuit breaker for {} entering half-open", self.endpoint_id);
                    self.half_open_inflight.fetch_add(1, Ordering::Relaxed);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                let inflight = self.half_open_inflight.fetch_add(1, Ordering::Relaxed) + 1;
                if inflight > self.policy.half_open_max_requests {
                    self.half_open_inflight.fetch_sub(1, Ordering::Relaxed);
                    false
                } else {
                    true
                }
            }
        }
    }

    async fn maybe_roll_window(&self) {
        let mut start = self.window_start.write().await;
        if start.elapsed() >= self.policy.window {
            *start = Instant::now();
            self.requests.store(0, Ordering::Relaxed);
            self.failures.store(0, Ordering::Relaxed);
        }
    }

    async fn on_success(&self, events: &EventBus) {
        match self.state() {
            CircuitState::Closed => {}
            CircuitState::HalfOpen => {
                self.half_open_inflight.fetch_sub(1, Ordering::Relaxed);
                let successes = self.half_open_successes.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.policy.half_open_success_threshold as u64 {
                    self.transition_to_closed();
                    info!("circuit breaker for {} closed - endpoint recovered", self.endpoint_id);
                    self.publish_reset(events).await;
                }
            }
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self, events: &EventBus) {
        match self.state() {
            CircuitState::Closed => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let requests = self.requests.load(Ordering::Relaxed);
                let failures = self.failures.load(Ordering::Relaxed);
                if requests >= self.policy.min_requests as u64
                    && (failures as f64 / requests as f64) >= self.policy.failure_ratio
                {
                    self.transition_to_open();
                    warn!("circuit breaker for {} tripped after {failures}/{requests} failures", self.endpoint_id);
                    self.publish_tripped(events).await;
                }
            }
            CircuitState::HalfOpen => {
                self.half_open_inflight.fetch_sub(1, Ordering::Relaxed);
                self.transition_to_open();
                warn!("circuit breaker for {} reopened after half-open probe failure", self.endpoint_id);
                self.publish_tripped(events).await;
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to_open(&self) {
        self.set_state(CircuitState::Open);
        // opened_at is read right after via async write lock in a blocking-free way
    }

    fn transition_to_half_open(&self) {
        self.set_state(CircuitState::HalfOpen);
        self.half_open_successes.store(0, Ordering::Relaxed);
        self.half_open_inflight.store(0, Ordering::Relaxed);
    }

    fn transition_to_closed(&self) {
        self.set_state(CircuitState::Closed);
        self.requests.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.half_open_successes.store(0, Ordering::Relaxed);
    }

    async fn publish_tripped(&self, events: &EventBus) {
        *self.opened_at.write().await = Some(Instant::now());
        events.publish(ProxyEvent::new(
            ProxyEventName::CircuitBreakerTripped,
            &self.endpoint_id,
            "",
            "",
            "",
            "",
        ));
    }

    async fn publish_reset(&self, events: &EventBus) {
        events.publish(ProxyEvent::new(
            ProxyEventName::CircuitBreakerReset,
            &self.endpoint_id,
            "",
            "",
            "",
            "",
        ));
    }
}

/// Per-process registry of breakers, keyed by endpoint id and created lazily
/// on first use.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    policy: BreakerPolicy,
}

impl CircuitBreakerRegistry {
    /// Creates an empty registry using the default trip policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use arcway_core::breaker::CircuitBreakerRegistry;
    ///
    /// let registry = CircuitBreakerRegistry::new();
    /// ```
    pub fn new() -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            policy: BreakerPolicy::default(),
        }
    }

    /// Returns the breaker for `endpoint_id`, creating one with the default
    /// policy on first access.
    ///
    /// # Examples
    ///
    /// ```
    /// # use arcway_core::breaker::CircuitBreakerRegistry;
    /// # async fn example() {
    /// let registry = CircuitBreakerRegistry::new();
    /// let breaker = registry.get_or_create("payments").await;
    /// # }
    /// ```
    pub async fn get_or_create(&self, endpoint_id: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().await.get(endpoint_id) {
            return existing.clone();
        }
        let mut guard = self.breakers.write().await;
        guard
            .entry(endpoint_id.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(endpoint_id.to_string(), self.policy)))
            .clone()
    }

    /// Drops breakers for endpoints no longer present in the Config Store,
    /// so a deleted endpoint's failure history doesn't linger in memory.
    pub async fn retain_endpoints(&self, live_ids: &std::collections::HashSet<String>) {
        self.breakers.write().await.retain(|id, _| live_ids.contains(id));
    }

    /// Snapshots every breaker currently tracked, in no particular order.
    pub async fn snapshots(&self) -> Vec<CircuitBreakerSnapshot> {
        self.breakers.read().await.values().map(|b| b.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trips_after_failure_ratio_breach() {
        let registry = CircuitBreakerRegistry::new();
        let events = EventBus::new();
        let breaker = registry.get_or_create("e1").await;

        for _ in 0..3 {
            let result: Result<(), CircuitBreakerError<&str>> =
                breaker.call(&events, || async { Err("boom") }).await;
            assert!(result.is_err());
        }

        let result: Result<(), CircuitBreakerError<&str>> =
            breaker.call(&events, || async { Ok(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn stays_closed_under_threshold() {
        let registry = CircuitBreakerRegistry::new();
        let events = EventBus::new();
        let breaker = registry.get_or_create("e1").await;

        let _: Result<(), CircuitBreakerError<&str>> = breaker.call(&events, || async { Err("boom") }).await;
        let result: Result<(), CircuitBreakerError<&str>> = breaker.call(&events, || async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn registry_returns_same_breaker_per_endpoint() {
        let registry = CircuitBreakerRegistry::new();
        let a = registry.get_or_create("e1").await;
        let b = registry.get_or_create("e1").await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
