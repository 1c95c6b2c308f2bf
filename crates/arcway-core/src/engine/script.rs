//! `script` flavour: a sandboxed embedded scripting engine standing in for
//! the contract's "ECMAScript-dialect interpreter" — the contract only
//! needs expression/function evaluation with JSON marshalling and a hard
//! time cap, not a browser-grade JS runtime.

use crate::error::GatewayError;
use rhai::{Engine, Scope, AST};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const TIME_CAP: Duration = Duration::from_millis(500);
const TRANSFORM_FN: &str = "transform";

fn sandboxed_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(2_000_000);
    engine.set_max_expr_depths(64, 32);
    engine.set_max_string_size(1_000_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);
    engine.disable_symbol("eval");
    engine
}

#[derive(Clone)]
pub struct ScriptCompiled {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    transformer_id: String,
}

impl ScriptCompiled {
    pub fn compile(transformer_id: &str, content: &str) -> Result<Self, GatewayError> {
        let engine = sandboxed_engine();
        let ast = engine.compile(content).map_err(|e| GatewayError::Transform {
            transformer_id: transformer_id.to_string(),
            message: format!("script compile error: {e}"),
        })?;
        if ast.iter_functions().all(|f| f.name != TRANSFORM_FN) {
            return Err(GatewayError::Transform {
                transformer_id: transformer_id.to_string(),
                message: "script must define a `transform(input)` function".to_string(),
            });
        }
        Ok(Self {
            engine: Arc::new(engine),
            ast: Arc::new(ast),
            transformer_id: transformer_id.to_string(),
        })
    }

    /// Runs `transform(input)` and serializes the result back through JSON,
    /// approximating the contract's `JSON.stringify(transform(input))` step.
    pub async fn run(&self, input: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let parsed: Value = serde_json::from_slice(input)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(input).into_owned()));

        let engine = self.engine.clone();
        let ast = self.ast.clone();
        let transformer_id = self.transformer_id.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<Value, GatewayError> {
            let dynamic = rhai::serde::to_dynamic(&parsed).map_err(|e| GatewayError::Transform {
                transformer_id: transformer_id.clone(),
                message: format!("failed to marshal input into script value: {e}"),
            })?;
            let mut scope = Scope::new();
            let result: rhai::Dynamic = engine
                .call_fn(&mut scope, &ast, TRANSFORM_FN, (dynamic,))
                .map_err(|e| GatewayError::Transform {
                    transformer_id: transformer_id.clone(),
                    message: format!("script execution error: {e}"),
                })?;
            rhai::serde::from_dynamic(&result).map_err(|e| GatewayError::Transform {
                transformer_id,
                message: format!("failed to marshal script result back to JSON: {e}"),
            })
        });

        match tokio::time::timeout(TIME_CAP, task).await {
            Ok(Ok(Ok(value))) => Ok(serde_json::to_vec(&value).unwrap_or_default()),
            Ok(Ok(Err(gateway_err))) => Err(gateway_err),
            Ok(Err(join_err)) => Err(GatewayError::Transform {
                transformer_id: self.transformer_id.clone(),
                message: format!("script task panicked: {join_err}"),
            }),
            Err(_) => Err(GatewayError::Transform {
                transformer_id: self.transformer_id.clone(),
                message: format!("script exceeded {}ms time cap", TIME_CAP.as_millis()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_transform_and_marshals_json() {
        let compiled = ScriptCompiled::compile(
            "s1",
            r#"fn transform(input) { input.greeting = "hi " + input.name; input }"#,
        )
        .unwrap();
        let out = compiled.run(br#"{"name":"ada"}"#).await.unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["greeting"], "hi ada");
    }

    #[test]
    fn rejects_script_without_transform_function() {
        let result = ScriptCompiled::compile("s1", "fn other(x) { x }");
        assert!(result.is_err());
    }
}
