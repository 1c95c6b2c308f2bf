//! `template` flavour: minijinja-backed text templating.

use crate::error::GatewayError;
use minijinja::Environment;
use serde_json::Value;

pub struct TemplateCompiled {
    env: Environment<'static>,
    transformer_id: String,
}

const TEMPLATE_NAME: &str = "t";

impl TemplateCompiled {
    pub fn compile(transformer_id: &str, content: &str) -> Result<Self, GatewayError> {
        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_NAME, content.to_string())
            .map_err(|e| GatewayError::Transform {
                transformer_id: transformer_id.to_string(),
                message: format!("template compile error: {e}"),
            })?;
        Ok(Self {
            env,
            transformer_id: transformer_id.to_string(),
        })
    }

    pub fn render(&self, input: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let parsed: Value = serde_json::from_slice(input).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(input).into_owned())
        });
        let template = self.env.get_template(TEMPLATE_NAME).map_err(|e| GatewayError::Transform {
            transformer_id: self.transformer_id.clone(),
            message: format!("template lookup error: {e}"),
        })?;
        let rendered = template
            .render(minijinja::context! { input => parsed })
            .map_err(|e| GatewayError::Transform {
                transformer_id: self.transformer_id.clone(),
                message: format!("template render error: {e}"),
            })?;
        Ok(rendered.into_bytes())
    }
}
