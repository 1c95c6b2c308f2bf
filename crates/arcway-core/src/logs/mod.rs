//! Observability: process-wide structured logging plus the audit trail the
//! data plane writes per proxied request.
//!
//! # Module organization
//! - [`logger`] - `env_logger` configuration for stdout structured logging
//! - [`sink`] - the append-only, header-scrubbing, body-truncating Log Sink

pub mod logger;
pub mod sink;
