//! The compilable payload-rewriter entity. Compilation itself lives in
//! [`crate::engine`]; this module only holds the declarative definition.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformerType {
    Template,
    Script,
    Mapping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransformerType,
    pub content: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub disabled: bool,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// One entry of a `mapping`-flavoured transformer's `content` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub transform: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDocument {
    pub mappings: Vec<MappingEntry>,
}
