//! The Transformer Engine: compiles a [`crate::models::transformer::Transformer`]
//! once into a runnable function and caches it, keyed by transformer id.
//!
//! # Module organization
//! - [`template`] - minijinja text templating
//! - [`script`] - sandboxed rhai scripting
//! - [`mapping`] - declarative field mapping

pub mod mapping;
pub mod script;
pub mod template;

use crate::error::GatewayError;
use crate::models::transformer::{Transformer, TransformerType};
use mapping::MappingCompiled;
use script::ScriptCompiled;
use std::collections::HashMap;
use std::sync::Arc;
use template::TemplateCompiled;
use tokio::sync::RwLock;

enum Compiled {
    Template(TemplateCompiled),
    Script(ScriptCompiled),
    Mapping(MappingCompiled),
}

/// Compiles and caches transformers. Replacement on hot reload is a single
/// `Arc` swap under the write lock, so readers always see a fully compiled
/// function, never a half-updated one.
#[derive(Default)]
pub struct TransformerEngine {
    compiled: RwLock<HashMap<String, Arc<Compiled>>>,
}

impl TransformerEngine {
    pub fn new() -> Self {
        Self {
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Compiles `transformer` and publishes it, replacing any prior entry
    /// for the same id. Returns the compile error without mutating the
    /// cache if compilation fails.
    pub async fn compile(&self, transformer: &Transformer) -> Result<(), GatewayError> {
        let compiled = match transformer.kind {
            TransformerType::Template => {
                Compiled::Template(TemplateCompiled::compile(&transformer.id, &transformer.content)?)
            }
            TransformerType::Script => {
                Compiled::Script(ScriptCompiled::compile(&transformer.id, &transformer.content)?)
            }
            TransformerType::Mapping => {
                Compiled::Mapping(MappingCompiled::compile(&transformer.id, &transformer.content)?)
            }
        };
        self.compiled.write().await.insert(transformer.id.clone(), Arc::new(compiled));
        Ok(())
    }

    pub async fn remove(&self, transformer_id: &str) {
        self.compiled.write().await.remove(transformer_id);
    }

    /// Runs the compiled transformer for `transformer_id` over `input`.
    pub async fn run(&self, transformer_id: &str, input: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let compiled = self
            .compiled
            .read()
            .await
            .get(transformer_id)
            .cloned()
            .ok_or_else(|| GatewayError::Transform {
                transformer_id: transformer_id.to_string(),
                message: "transformer is not compiled".to_string(),
            })?;
        match compiled.as_ref() {
            Compiled::Template(t) => t.render(input),
            Compiled::Script(s) => s.run(input).await,
            Compiled::Mapping(m) => m.run(input),
        }
    }

    pub async fn is_compiled(&self, transformer_id: &str) -> bool {
        self.compiled.read().await.contains_key(transformer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transformer::TransformerType;

    fn transformer(id: &str, kind: TransformerType, content: &str) -> Transformer {
        Transformer {
            id: id.into(),
            name: id.into(),
            kind,
            content: content.into(),
            content_type: "application/json".into(),
            disabled: false,
        }
    }

    #[tokio::test]
    async fn compiles_and_runs_template() {
        let engine = TransformerEngine::new();
        engine
            .compile(&transformer("t1", TransformerType::Template, "hi {{ input.name }}"))
            .await
            .unwrap();
        let out = engine.run("t1", br#"{"name":"ada"}"#).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hi ada");
    }

    #[tokio::test]
    async fn hot_reload_replaces_cached_entry_atomically() {
        let engine = TransformerEngine::new();
        engine
            .compile(&transformer("t1", TransformerType::Template, "v1"))
            .await
            .unwrap();
        engine
            .compile(&transformer("t1", TransformerType::Template, "v2"))
            .await
            .unwrap();
        let out = engine.run("t1", b"{}").await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "v2");
    }

    #[tokio::test]
    async fn failed_compile_does_not_disturb_prior_cache_entry() {
        let engine = TransformerEngine::new();
        engine
            .compile(&transformer("t1", TransformerType::Template, "v1"))
            .await
            .unwrap();
        let err = engine
            .compile(&transformer("t1", TransformerType::Template, "{{ unterminated"))
            .await;
        assert!(err.is_err());
        let out = engine.run("t1", b"{}").await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "v1");
    }

    #[tokio::test]
    async fn missing_transformer_surfaces_transform_error() {
        let engine = TransformerEngine::new();
        let result = engine.run("missing", b"{}").await;
        assert!(result.is_err());
    }
}
