//! HTTP surfaces exposed by the Arcway gateway.
//!
//! # Module organization
//! - [`health`] - liveness/readiness probes, bypassing the Route Matcher entirely
//! - [`proxy`] - the data-plane `/proxy/*` and `/ws/*` surfaces
//! - [`admin`] - the operator CRUD API over endpoints, routes, and transformers

pub mod admin;
pub mod health;
pub mod proxy;
