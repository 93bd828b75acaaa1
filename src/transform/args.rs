//! Plugin arguments to `PLUGIN_*` environment variables

use super::{Transform, TransformError};
use crate::parse::{ContainerNode, Workspace};
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;

const PREFIX: &str = "PLUGIN_";

fn invalid_chars() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Z0-9_]").ok()).as_ref()
}

/// Exposes free-form plugin settings to the plugin process
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgsTransform;

/// `PLUGIN_` plus the uppercased key with anything outside `[A-Z0-9_]` replaced
pub fn env_key(key: &str) -> String {
    let upper = key.to_uppercase();
    match invalid_chars() {
        Some(re) => format!("{}{}", PREFIX, re.replace_all(&upper, "_")),
        None => format!("{}{}", PREFIX, upper),
    }
}

/// Render a YAML value the way plugins expect to read it
pub fn env_value(value: &Value) -> Result<String, TransformError> {
    let rendered = match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) if items.iter().all(is_scalar) => {
            let parts: Result<Vec<_>, _> = items.iter().map(env_value).collect();
            parts?.join(",")
        }
        Value::Tagged(tagged) => env_value(&tagged.value)?,
        other => serde_json::to_string(other)
            .map_err(|e| TransformError::new(format!("cannot encode plugin argument: {}", e)))?,
    };
    Ok(rendered)
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

impl Transform for ArgsTransform {
    fn name(&self) -> &'static str {
        "args"
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        if !node.kind.is_plugin_like() {
            return Ok(());
        }
        for (key, value) in &node.vargs {
            let value = env_value(value)
                .map_err(|e| TransformError::new(format!("{}: {}", node.container.name, e)))?;
            node.container.environment.insert(env_key(key), value);
        }
        Ok(())
    }
}
