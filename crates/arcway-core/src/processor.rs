//! The Processor: pre/post hooks bound to a specific `(endpoint_id, route_id)`
//! pair, run immediately before a request is forwarded and immediately after
//! a response is received.
//!
//! Hooks are plain closures here rather than a scripting-engine contract —
//! the engine-backed transform step lives in [`crate::engine`]; this module
//! only owns the registration table and the pass-through-when-absent policy.

use crate::error::GatewayError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type Hook<T> = Arc<dyn Fn(T) -> Result<T, GatewayError> + Send + Sync>;

#[derive(Clone)]
struct Hooks<T> {
    pre: Option<Hook<T>>,
    post: Option<Hook<T>>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            pre: None,
            post: None,
        }
    }
}

/// Binds at most one pre-hook and one post-hook per `(endpoint_id, route_id)`.
pub struct Processor<T> {
    bindings: RwLock<HashMap<(String, String), Hooks<T>>>,
}

impl<T> Default for Processor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Processor<T> {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a pre-hook for the binding, failing if one is already set.
    pub async fn register_pre(&self, endpoint_id: &str, route_id: &str, hook: Hook<T>) -> Result<(), GatewayError> {
        let mut guard = self.bindings.write().await;
        let entry = guard.entry((endpoint_id.to_string(), route_id.to_string())).or_default();
        if entry.pre.is_some() {
            return Err(GatewayError::AlreadyRegistered(format!(
                "pre-hook already registered for {endpoint_id}/{route_id}"
            )));
        }
        entry.pre = Some(hook);
        Ok(())
    }

    /// Registers a post-hook for the binding, failing if one is already set.
    pub async fn register_post(&self, endpoint_id: &str, route_id: &str, hook: Hook<T>) -> Result<(), GatewayError> {
        let mut guard = self.bindings.write().await;
        let entry = guard.entry((endpoint_id.to_string(), route_id.to_string())).or_default();
        if entry.post.is_some() {
            return Err(GatewayError::AlreadyRegistered(format!(
                "post-hook already registered for {endpoint_id}/{route_id}"
            )));
        }
        entry.post = Some(hook);
        Ok(())
    }

    /// Runs the pre-hook if one is bound, otherwise passes `value` through unchanged.
    pub async fn pre(&self, endpoint_id: &str, route_id: &str, value: T) -> Result<T, GatewayError> {
        let hook = self
            .bindings
            .read()
            .await
            .get(&(endpoint_id.to_string(), route_id.to_string()))
            .and_then(|h| h.pre.clone());
        match hook {
            Some(hook) => hook(value),
            None => Ok(value),
        }
    }

    /// Runs the post-hook if one is bound, otherwise passes `value` through unchanged.
    pub async fn post(&self, endpoint_id: &str, route_id: &str, value: T) -> Result<T, GatewayError> {
        let hook = self
            .bindings
            .read()
            .await
            .get(&(endpoint_id.to_string(), route_id.to_string()))
            .and_then(|h| h.post.clone());
        match hook {
            Some(hook) => hook(value),
            None => Ok(value),
        }
    }

    pub async fn unregister(&self, endpoint_id: &str, route_id: &str) {
        self.bindings
            .write()
            .await
            .remove(&(endpoint_id.to_string(), route_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_when_no_hook_bound() {
        let processor: Processor<String> = Processor::new();
        let out = processor.pre("e1", "r1", "hello".to_string()).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn runs_registered_pre_hook() {
        let processor: Processor<String> = Processor::new();
        processor
            .register_pre("e1", "r1", Arc::new(|v: String| Ok(v.to_uppercase())))
            .await
            .unwrap();
        let out = processor.pre("e1", "r1", "hello".to_string()).await.unwrap();
        assert_eq!(out, "HELLO");
    }

    #[tokio::test]
    async fn rejects_duplicate_registration() {
        let processor: Processor<String> = Processor::new();
        processor.register_pre("e1", "r1", Arc::new(Ok)).await.unwrap();
        let result = processor.register_pre("e1", "r1", Arc::new(Ok)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn hook_error_propagates() {
        let processor: Processor<String> = Processor::new();
        processor
            .register_post(
                "e1",
                "r1",
                Arc::new(|_: String| {
                    Err(GatewayError::Hook {
                        endpoint_id: "e1".into(),
                        route_id: "r1".into(),
                        message: "boom".into(),
                    })
                }),
            )
            .await
            .unwrap();
        let result = processor.post("e1", "r1", "x".to_string()).await;
        assert!(result.is_err());
    }
}
