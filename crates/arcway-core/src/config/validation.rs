//! Configuration validation with detailed error reporting.
//!
//! Complements the structural per-entity `validate()` methods on
//! [`crate::models::endpoint::Endpoint`] and [`crate::models::route::Route`]
//! with cross-entity checks: security posture, performance heuristics, and
//! route conflicts, across the whole configuration loaded into the
//! [`super::store`] Config Store.

use crate::models::endpoint::Endpoint;
use crate::models::route::Route;
use crate::models::transformer::Transformer;
use log::{info, warn};
use std::collections::HashSet;

/// Result of configuration validation containing errors, warnings, and recommendations.
///
/// # Examples
///
/// ```
/// use arcway_core::config::validation::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// result.add_error("Missing required field".to_string());
/// result.add_warning("Using default value".to_string());
/// result.add_recommendation("Consider enabling HTTPS".to_string());
///
/// assert!(!result.is_valid);
/// assert_eq!(result.errors.len(), 1);
/// assert_eq!(result.warnings.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    /// Creates a new validation result with no errors, warnings, or recommendations.
    ///
    /// # Examples
    ///
    /// ```
    /// use arcway_core::config::validation::ValidationResult;
    ///
    /// let result = ValidationResult::new();
    /// assert!(result.is_valid);
    /// assert!(result.errors.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// Adds a critical error and marks validation as failed.
    ///
    /// # Parameters
    ///
    /// * `error` - Description of the validation error
    ///
    /// # Examples
    ///
    /// ```
    /// use arcway_core::config::validation::ValidationResult;
    ///
    /// let mut result = ValidationResult::new();
    /// result.add_error("duplicate route id".to_string());
    /// assert!(!result.is_valid);
    /// ```
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Adds a non-critical warning that should be addressed.
    ///
    /// # Parameters
    ///
    /// * `warning` - Description of the validation warning
    ///
    /// # Examples
    ///
    /// ```
    /// use arcway_core::config::validation::ValidationResult;
    ///
    /// let mut result = ValidationResult::new();
    /// result.add_warning("endpoint uses plain HTTP".to_string());
    /// assert!(result.is_valid); // still valid despite the warning
    /// ```
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Adds a recommendation for improving the configuration.
    ///
    /// # Parameters
    ///
    /// * `recommendation` - Suggestion for configuration improvement
    ///
    /// # Examples
    ///
    /// ```
    /// use arcway_core::config::validation::ValidationResult;
    ///
    /// let mut result = ValidationResult::new();
    /// result.add_recommendation("add a static route for this hot path".to_string());
    /// assert_eq!(result.recommendations.len(), 1);
    /// ```
    pub fn add_recommendation(&mut self, recommendation: String) {
        self.recommendations.push(recommendation);
    }
}

/// Enhanced configuration validator with security and performance checks.
///
/// Provides comprehensive validation including:
/// - Basic structure validation (unknown endpoint references, per-entity checks)
/// - Security checks (insecure transport, path traversal)
/// - Performance analysis (dynamic route count, parameter density)
/// - Route conflict and duplicate detection
/// - Transformer reference validation
///
/// Called from the Admin API before any write to the Config Store is
/// accepted, against the configuration that write would produce — never
/// against the configuration already committed.
///
/// # Examples
///
/// ```
/// use arcway_core::config::validation::ConfigValidator;
///
/// let result = ConfigValidator::validate_comprehensive(&[], &[], &[]);
/// assert!(result.is_valid);
/// ```
pub struct ConfigValidator;

impl ConfigValidator {
    /// Performs comprehensive validation of a candidate endpoint/route/
    /// transformer set.
    ///
    /// # Parameters
    ///
    /// * `endpoints` - candidate endpoint set
    /// * `routes` - candidate route set
    /// * `transformers` - candidate transformer set
    ///
    /// # Returns
    ///
    /// `ValidationResult` containing errors, warnings, and recommendations
    ///
    /// # Examples
    ///
    /// ```
    /// use arcway_core::config::validation::ConfigValidator;
    ///
    /// let result = ConfigValidator::validate_comprehensive(&[], &[], &[]);
    /// println!("valid: {}", result.is_valid);
    /// ```
    pub fn validate_comprehensive(
        endpoints: &[Endpoint],
        routes: &[Route],
        transformers: &[Transformer],
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_basic_structure(endpoints, routes, &mut result);
        Self::validate_security(endpoints, routes, &mut result);
        Self::validate_performance(routes, &mut result);
        Self::validate_route_conflicts(routes, &mut result);
        Self::validate_transformer_references(routes, transformers, &mut result);
        Self::log_validation_results(&result);

        result
    }

    fn validate_basic_structure(endpoints: &[Endpoint], routes: &[Route], result: &mut ValidationResult) {
        if routes.is_empty() {
            result.add_warning("No routes configured - gateway will not handle any proxy traffic".to_string());
        }

        for endpoint in endpoints {
            if let Err(error) = endpoint.validate() {
                result.add_error(error);
            }
        }
        for route in routes {
            if let Err(error) = route.validate() {
                result.add_error(error);
            }
            if !endpoints.iter().any(|e| e.id == route.endpoint_id) {
                result.add_error(format!(
                    "route {} references unknown endpoint {}",
                    route.id, route.endpoint_id
                ));
            }
        }
    }

    fn validate_security(endpoints: &[Endpoint], routes: &[Route], result: &mut ValidationResult) {
        let mut http_count = 0;
        let mut https_count = 0;

        for endpoint in endpoints {
            match endpoint.protocol {
                crate::models::endpoint::Protocol::Http | crate::models::endpoint::Protocol::Ws => {
                    http_count += 1;
                    if !endpoint.base_url.contains("localhost") && !endpoint.base_url.contains("127.0.0.1") {
                        result.add_warning(format!(
                            "insecure endpoint {}: {} - consider HTTPS/WSS for production",
                            endpoint.name, endpoint.base_url
                        ));
                    }
                }
                crate::models::endpoint::Protocol::Https | crate::models::endpoint::Protocol::Wss => {
                    https_count += 1;
                }
                _ => {}
            }
        }

        if http_count > 0 && https_count == 0 {
            result.add_warning("all endpoints use an unencrypted transport - consider TLS for production".to_string());
        }

        for route in routes {
            if route.path_pattern.contains("..") || route.target_path.contains("..") {
                result.add_error(format!(
                    "path traversal segment in route {}: {} -> {}",
                    route.id, route.path_pattern, route.target_path
                ));
            }
        }
    }

    fn validate_performance(routes: &[Route], result: &mut ValidationResult) {
        let dynamic_routes = routes
            .iter()
            .filter(|r| r.path_pattern.contains(':') || r.path_pattern.contains('*'))
            .count();
        let static_routes = routes.len() - dynamic_routes;

        if dynamic_routes > 50 {
            result.add_warning(format!(
                "high number of dynamic routes ({dynamic_routes}) may impact matcher throughput"
            ));
        }
        if static_routes == 0 && dynamic_routes > 0 {
            result.add_recommendation(
                "consider adding static routes for hot paths to skip parameterised matching".to_string(),
            );
        }
        for route in routes {
            let param_count = route.path_pattern.matches(':').count();
            if param_count > 3 {
                result.add_warning(format!(
                    "route {} has many parameters ({param_count}) - may impact matching performance",
                    route.id
                ));
            }
        }
    }

    fn validate_route_conflicts(routes: &[Route], result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for route in routes {
            let key = (route.endpoint_id.clone(), route.path_pattern.clone(), route.method.clone());
            if !seen.insert(key) {
                result.add_error(format!(
                    "duplicate route: endpoint {}, pattern {}, method {}",
                    route.endpoint_id, route.path_pattern, route.method
                ));
            }
        }

        for (i, a) in routes.iter().enumerate() {
            for b in routes.iter().skip(i + 1) {
                if a.path_pattern != b.path_pattern && Self::patterns_may_conflict(&a.path_pattern, &b.path_pattern) {
                    result.add_warning(format!(
                        "potential route conflict between '{}' and '{}' - specificity order matters",
                        a.path_pattern, b.path_pattern
                    ));
                }
            }
        }
    }

    fn patterns_may_conflict(a: &str, b: &str) -> bool {
        let a_segments: Vec<&str> = a.split('/').collect();
        let b_segments: Vec<&str> = b.split('/').collect();
        if a_segments.len() != b_segments.len() {
            return false;
        }
        for (sa, sb) in a_segments.iter().zip(b_segments.iter()) {
            if sa.starts_with(':') || sb.starts_with(':') || *sa == "*" || *sb == "*" {
                continue;
            }
            if sa != sb {
                return false;
            }
        }
        true
    }

    fn validate_transformer_references(routes: &[Route], transformers: &[Transformer], result: &mut ValidationResult) {
        for route in routes {
            for maybe_id in [&route.input_transformer_id, &route.output_transformer_id] {
                if let Some(id) = maybe_id {
                    match transformers.iter().find(|t| &t.id == id) {
                        None => result.add_error(format!(
                            "route {} references unknown transformer {id}",
                            route.id
                        )),
                        Some(t) if t.disabled => result.add_warning(format!(
                            "route {} references disabled transformer {id}",
                            route.id
                        )),
                        _ => {}
                    }
                }
            }
        }
    }

    fn log_validation_results(result: &ValidationResult) {
        if result.is_valid {
            info!("configuration validation passed");
        } else {
            for error in &result.errors {
                log::error!("validation error: {error}");
            }
        }
        for warning in &result.warnings {
            warn!("validation warning: {warning}");
        }
        for recommendation in &result.recommendations {
            info!("recommendation: {recommendation}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::endpoint::{AuthType, Protocol};

    fn endpoint(id: &str, base_url: &str) -> Endpoint {
        Endpoint {
            id: id.into(),
            name: id.into(),
            base_url: base_url.into(),
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

    fn route(id: &str, endpoint_id: &str, pattern: &str) -> Route {
        Route {
            id: id.into(),
            name: id.into(),
            endpoint_id: endpoint_id.into(),
            path_pattern: pattern.into(),
            target_path: pattern.into(),
            method: "GET".into(),
            input_transformer_id: None,
            output_transformer_id: None,
            cache_enabled: false,
            cache_ttl_seconds: None,
            rate_limit: None,
            strip_auth_header: false,
            disabled: false,
        }
    }

    #[test]
    fn flags_route_with_unknown_endpoint() {
        let result = ConfigValidator::validate_comprehensive(&[], &[route("r1", "missing", "/x")], &[]);
        assert!(!result.is_valid);
    }

    #[test]
    fn flags_duplicate_routes() {
        let endpoints = vec![endpoint("e1", "http://up/")];
        let routes = vec![route("r1", "e1", "/x"), route("r2", "e1", "/x")];
        let result = ConfigValidator::validate_comprehensive(&endpoints, &routes, &[]);
        assert!(!result.is_valid);
    }

    #[test]
    fn clean_config_passes() {
        let endpoints = vec![endpoint("e1", "https://up/")];
        let routes = vec![route("r1", "e1", "/x")];
        let result = ConfigValidator::validate_comprehensive(&endpoints, &routes, &[]);
        assert!(result.is_valid);
    }
}
