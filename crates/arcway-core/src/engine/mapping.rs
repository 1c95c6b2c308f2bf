//! `mapping` flavour: declarative field-to-field JSON rewriting, with an
//! optional per-entry rhai expression for value transformation.

use crate::error::GatewayError;
use crate::models::transformer::MappingDocument;
use rhai::{Engine, Scope};
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct MappingCompiled {
    document: MappingDocument,
    transformer_id: String,
}

impl MappingCompiled {
    pub fn compile(transformer_id: &str, content: &str) -> Result<Self, GatewayError> {
        let document: MappingDocument = serde_json::from_str(content).map_err(|e| GatewayError::Transform {
            transformer_id: transformer_id.to_string(),
            message: format!("mapping document is not valid JSON: {e}"),
        })?;
        Ok(Self {
            document,
            transformer_id: transformer_id.to_string(),
        })
    }

    pub fn run(&self, input: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let source: Value = serde_json::from_slice(input).map_err(|e| GatewayError::Transform {
            transformer_id: self.transformer_id.clone(),
            message: format!("mapping input is not valid JSON: {e}"),
        })?;

        let mut output = Value::Object(Map::new());
        let engine = Engine::new();

        for entry in &self.document.mappings {
            let mut value = get_path(&source, &entry.source)
                .cloned()
                .or_else(|| entry.default_value.clone())
                .unwrap_or(Value::Null);

            if let Some(expr) = &entry.transform {
                let mut scope = Scope::new();
                scope.push_dynamic("value", rhai::serde::to_dynamic(&value).map_err(|e| {
                    GatewayError::Transform {
                        transformer_id: self.transformer_id.clone(),
                        message: format!("failed to marshal mapping value: {e}"),
                    }
                })?);
                let result: rhai::Dynamic = engine.eval_expression_with_scope(&mut scope, expr).map_err(|e| {
                    GatewayError::Transform {
                        transformer_id: self.transformer_id.clone(),
                        message: format!("mapping transform expression failed for {}: {e}", entry.target),
                    }
                })?;
                value = rhai::serde::from_dynamic(&result).map_err(|e| GatewayError::Transform {
                    transformer_id: self.transformer_id.clone(),
                    message: format!("failed to marshal mapping transform result: {e}"),
                })?;
            }

            set_path(&mut output, &entry.target, value);
        }

        serde_json::to_vec(&output).map_err(|e| GatewayError::Transform {
            transformer_id: self.transformer_id.clone(),
            message: format!("failed to serialize mapping output: {e}"),
        })
    }
}

fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

fn set_path(root: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = current
            .as_object_mut()
            .unwrap()
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current
        .as_object_mut()
        .unwrap()
        .insert(segments.last().unwrap().to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_source_to_target_with_default() {
        let doc = r#"{"mappings":[
            {"source":"user.name","target":"full_name"},
            {"source":"user.missing","target":"nickname","default_value":"anon"}
        ]}"#;
        let compiled = MappingCompiled::compile("m1", doc).unwrap();
        let out = compiled.run(br#"{"user":{"name":"ada"}}"#).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["full_name"], "ada");
        assert_eq!(value["nickname"], "anon");
    }

    #[test]
    fn applies_transform_expression() {
        let doc = r#"{"mappings":[
            {"source":"count","target":"doubled","transform":"value * 2"}
        ]}"#;
        let compiled = MappingCompiled::compile("m1", doc).unwrap();
        let out = compiled.run(br#"{"count":21}"#).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["doubled"], 42);
    }

    #[test]
    fn writes_nested_dotted_targets() {
        let doc = r#"{"mappings":[{"source":"id","target":"meta.identifiers.primary"}]}"#;
        let compiled = MappingCompiled::compile("m1", doc).unwrap();
        let out = compiled.run(br#"{"id":"abc"}"#).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["meta"]["identifiers"]["primary"], "abc");
    }
}
