//! # Arcway Gateway Core
//!
//! The data-plane library behind the Arcway API gateway: route matching,
//! the transformer engine, circuit breaking, the HTTP forwarder, and the
//! WebSocket bridge. `arcway-server` wires these into an Actix Web process;
//! this crate has no `main` of its own so it can be embedded or tested in
//! isolation.
//!
//! ## Module organization
//!
//! - [`config`] - the Config Store and bootstrap settings
//! - [`models`] - data models for endpoints, routes, transformers, events, logs
//! - [`matcher`] - the Route Matcher
//! - [`engine`] - the Transformer Engine (template/script/mapping)
//! - [`breaker`] - the Circuit Breaker Registry
//! - [`processor`] - the pre/post hook Processor
//! - [`events`] - the Event Bus Adapter
//! - [`forwarder`] - the HTTP Forwarder pipeline
//! - [`bridge`] - the WebSocket Bridge
//! - [`logs`] - structured process logging and the audit Log Sink
//! - [`routes`] - HTTP surfaces: health, data-plane proxy, admin CRUD
//! - [`middleware`] - cross-cutting HTTP middleware
//! - [`error`] - the gateway-wide error taxonomy

pub mod breaker;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod forwarder;
pub mod logs;
pub mod matcher;
pub mod middleware;
pub mod models;
pub mod processor;
pub mod routes;
