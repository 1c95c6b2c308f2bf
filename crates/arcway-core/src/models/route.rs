//! The path/method binding that maps an external URI onto an endpoint path.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub endpoint_id: String,
    /// Leading-slash pattern; segments are literal, `:name` parameters, or a
    /// trailing `*` wildcard.
    pub path_pattern: String,
    /// Same segment syntax as `path_pattern`; `:name` occurrences are
    /// substituted with the bound value at forwarding time.
    pub target_path: String,
    /// Upper-case HTTP verb, or `ANY`/`*`.
    pub method: String,
    #[serde(default)]
    pub input_transformer_id: Option<String>,
    #[serde(default)]
    pub output_transformer_id: Option<String>,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub cache_ttl_seconds: Option<u64>,
    /// Parsed but unenforced, e.g. `"100/minute"` — see open question in the
    /// design notes on rate-limit enforcement.
    #[serde(default)]
    pub rate_limit: Option<String>,
    #[serde(default)]
    pub strip_auth_header: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl Route {
    pub fn is_any_method(&self) -> bool {
        matches!(self.method.as_str(), "ANY" | "*")
    }

    /// Validates the `target_path` params-are-a-subset-of-`path_pattern`
    /// invariant.
    pub fn validate(&self) -> Result<(), String> {
        if !self.path_pattern.starts_with('/') {
            return Err(format!("route {} path_pattern must start with /", self.id));
        }
        if !self.target_path.starts_with('/') {
            return Err(format!("route {} target_path must start with /", self.id));
        }
        let declared = params_of(&self.path_pattern);
        for used in params_of(&self.target_path) {
            if !declared.contains(&used) {
                return Err(format!(
                    "route {} target_path references :{used} which is not in path_pattern",
                    self.id
                ));
            }
        }
        Ok(())
    }
}

fn params_of(pattern: &str) -> Vec<String> {
    pattern
        .split('/')
        .filter_map(|seg| seg.strip_prefix(':').map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path_pattern: &str, target_path: &str) -> Route {
        Route {
            id: "r1".into(),
            name: "r1".into(),
            endpoint_id: "e1".into(),
            path_pattern: path_pattern.into(),
            target_path: target_path.into(),
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
    fn accepts_subset_params() {
        assert!(route("/users/:id", "/v1/users/:id").validate().is_ok());
    }

    #[test]
    fn rejects_unknown_target_param() {
        assert!(route("/users", "/v1/users/:id").validate().is_err());
    }
}
