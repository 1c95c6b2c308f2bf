//! Cross-cutting HTTP middleware for the Arcway gateway.
//!
//! # Module organization
//! - [`security`] - static security response headers applied to every route

pub mod security;
