//! Data models and domain types for the Arcway gateway core.
//!
//! These are the entities of the proxy data plane: addressable upstreams,
//! the route patterns bound to them, compilable payload transformers,
//! circuit-breaker state, and the two append-only record types (events,
//! logs) the pipeline emits as it runs a request.
//!
//! # Module Organization
//!
//! - [`endpoint`] - upstream service definitions and auth injection
//! - [`route`] - path/method bindings and their validation
//! - [`transformer`] - declarative payload-rewriter definitions
//! - [`circuit_breaker`] - breaker state and the fixed trip policy
//! - [`event`] - typed records published on the event bus
//! - [`log`] - the audit record persisted by the Log Sink

pub mod circuit_breaker;
pub mod endpoint;
pub mod event;
pub mod log;
pub mod route;
pub mod transformer;
