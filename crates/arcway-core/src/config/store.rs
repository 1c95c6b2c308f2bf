//! The Config Store: the data plane's read-only view of endpoints, routes,
//! and transformers. Mutation is exposed only through [`crate::routes::admin`];
//! the data plane itself only ever calls the `get_*`/`list_*` operations below.

use crate::error::GatewayError;
use crate::models::endpoint::Endpoint;
use crate::models::route::Route;
use crate::models::transformer::Transformer;
use std::collections::HashMap;
use std::sync::RwLock;

/// Operations the data plane drives the Config Store through. A persistent,
/// database-backed implementation can be swapped in without touching the
/// Route Matcher, Forwarder, or Bridge — they depend only on this trait.
pub trait ConfigStore: Send + Sync {
    fn get_endpoint_by_id(&self, id: &str) -> Result<Option<Endpoint>, GatewayError>;
    fn get_transformer_by_id(&self, id: &str) -> Result<Option<Transformer>, GatewayError>;
    fn list_active_endpoints(&self) -> Result<Vec<Endpoint>, GatewayError>;
    fn list_active_routes(&self) -> Result<Vec<Route>, GatewayError>;
    fn list_active_transformers(&self) -> Result<Vec<Transformer>, GatewayError>;

    fn upsert_endpoint(&self, endpoint: Endpoint) -> Result<(), GatewayError>;
    fn upsert_route(&self, route: Route) -> Result<(), GatewayError>;
    fn upsert_transformer(&self, transformer: Transformer) -> Result<(), GatewayError>;
    fn delete_endpoint(&self, id: &str) -> Result<(), GatewayError>;
    fn delete_route(&self, id: &str) -> Result<(), GatewayError>;
    fn delete_transformer(&self, id: &str) -> Result<(), GatewayError>;
}

/// Single-instance, in-process Config Store. `RwLock`-guarded maps give
/// concurrent readers and writer exclusion, publishing each write as a
/// single atomic swap rather than a stream of partial mutations.
#[derive(Default)]
pub struct InMemoryConfigStore {
    endpoints: RwLock<HashMap<String, Endpoint>>,
    routes: RwLock<HashMap<String, Route>>,
    transformers: RwLock<HashMap<String, Transformer>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(endpoints: Vec<Endpoint>, routes: Vec<Route>, transformers: Vec<Transformer>) -> Self {
        let store = Self::new();
        for e in endpoints {
            store.endpoints.write().unwrap().insert(e.id.clone(), e);
        }
        for r in routes {
            store.routes.write().unwrap().insert(r.id.clone(), r);
        }
        for t in transformers {
            store.transformers.write().unwrap().insert(t.id.clone(), t);
        }
        store
    }

    fn lookup_err(context: &str) -> GatewayError {
        GatewayError::ConfigLookup(context.to_string())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get_endpoint_by_id(&self, id: &str) -> Result<Option<Endpoint>, GatewayError> {
        let guard = self
            .endpoints
            .read()
            .map_err(|_| Self::lookup_err("endpoints lock poisoned"))?;
        Ok(guard.get(id).cloned())
    }

    fn get_transformer_by_id(&self, id: &str) -> Result<Option<Transformer>, GatewayError> {
        let guard = self
            .transformers
            .read()
            .map_err(|_| Self::lookup_err("transformers lock poisoned"))?;
        Ok(guard.get(id).cloned())
    }

    fn list_active_endpoints(&self) -> Result<Vec<Endpoint>, GatewayError> {
        let guard = self
            .endpoints
            .read()
            .map_err(|_| Self::lookup_err("endpoints lock poisoned"))?;
        Ok(guard.values().filter(|e| !e.disabled).cloned().collect())
    }

    fn list_active_routes(&self) -> Result<Vec<Route>, GatewayError> {
        let guard = self
            .routes
            .read()
            .map_err(|_| Self::lookup_err("routes lock poisoned"))?;
        Ok(guard.values().filter(|r| !r.disabled).cloned().collect())
    }

    fn list_active_transformers(&self) -> Result<Vec<Transformer>, GatewayError> {
        let guard = self
            .transformers
            .read()
            .map_err(|_| Self::lookup_err("transformers lock poisoned"))?;
        Ok(guard.values().filter(|t| !t.disabled).cloned().collect())
    }

    fn upsert_endpoint(&self, endpoint: Endpoint) -> Result<(), GatewayError> {
        endpoint.validate().map_err(GatewayError::Validation)?;
        let mut guard = self
            .endpoints
            .write()
            .map_err(|_| Self::lookup_err("endpoints lock poisoned"))?;
        guard.insert(endpoint.id.clone(), endpoint);
        Ok(())
    }

    fn upsert_route(&self, route: Route) -> Result<(), GatewayError> {
        route.validate().map_err(GatewayError::Validation)?;
        let mut guard = self
            .routes
            .write()
            .map_err(|_| Self::lookup_err("routes lock poisoned"))?;
        guard.insert(route.id.clone(), route);
        Ok(())
    }

    fn upsert_transformer(&self, transformer: Transformer) -> Result<(), GatewayError> {
        let mut guard = self
            .transformers
            .write()
            .map_err(|_| Self::lookup_err("transformers lock poisoned"))?;
        guard.insert(transformer.id.clone(), transformer);
        Ok(())
    }

    fn delete_endpoint(&self, id: &str) -> Result<(), GatewayError> {
        self.endpoints
            .write()
            .map_err(|_| Self::lookup_err("endpoints lock poisoned"))?
            .remove(id);
        Ok(())
    }

    fn delete_route(&self, id: &str) -> Result<(), GatewayError> {
        self.routes
            .write()
            .map_err(|_| Self::lookup_err("routes lock poisoned"))?
            .remove(id);
        Ok(())
    }

    fn delete_transformer(&self, id: &str) -> Result<(), GatewayError> {
        self.transformers
            .write()
            .map_err(|_| Self::lookup_err("transformers lock poisoned"))?
            .remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::endpoint::{AuthType, Protocol};

    fn sample_endpoint() -> Endpoint {
        Endpoint {
            id: "e1".into(),
            name: "up".into(),
            base_url: "http://up/".into(),
            protocol: Protocol::Http,
            auth_type: AuthType::None,
            auth_config: None,
            timeout_ms: 1000,
            use_circuit_breaker: false,
            retry_count: 0,
            validate_ssl: true,
            log_requests: false,
            log_responses: false,
            disabled: false,
        }
    }

    #[test]
    fn round_trips_an_endpoint() {
        let store = InMemoryConfigStore::new();
        store.upsert_endpoint(sample_endpoint()).unwrap();
        assert!(store.get_endpoint_by_id("e1").unwrap().is_some());
        assert_eq!(store.list_active_endpoints().unwrap().len(), 1);
        store.delete_endpoint("e1").unwrap();
        assert!(store.get_endpoint_by_id("e1").unwrap().is_none());
    }

    #[test]
    fn disabled_endpoints_are_excluded_from_listing() {
        let store = InMemoryConfigStore::new();
        let mut endpoint = sample_endpoint();
        endpoint.disabled = true;
        store.upsert_endpoint(endpoint).unwrap();
        assert!(store.list_active_endpoints().unwrap().is_empty());
    }
}
