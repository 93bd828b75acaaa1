//! Clone and cache step defaults
//!
//! Both steps run with repository credentials in reach, so only the image and
//! alias the author chose are kept. Every other container attribute is reset.

use super::{Transform, TransformError};
use crate::core::{Config, Container};
use crate::parse::{ContainerNode, NodeKind, Workspace};
use tracing::debug;

pub const DEFAULT_CLONE_IMAGE: &str = "git";
pub const DEFAULT_CACHE_IMAGE: &str = "cache";

/// Settings for one built-in step
#[derive(Debug, Clone)]
pub struct BuiltinStep {
    pub image: String,
    pub disable: bool,
}

#[derive(Debug, Clone)]
pub struct PluginTransform {
    clone: BuiltinStep,
    cache: BuiltinStep,
}

impl PluginTransform {
    pub fn new(clone: BuiltinStep, cache: BuiltinStep) -> Self {
        Self { clone, cache }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            BuiltinStep {
                image: config.clone.image.clone().unwrap_or_else(|| DEFAULT_CLONE_IMAGE.to_string()),
                disable: config.clone.disable,
            },
            BuiltinStep {
                image: config.cache.image.clone().unwrap_or_else(|| DEFAULT_CACHE_IMAGE.to_string()),
                disable: config.cache.disable,
            },
        )
    }
}

impl Default for PluginTransform {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Transform for PluginTransform {
    fn name(&self) -> &'static str {
        "plugin"
    }

    fn visit_container(&self, node: &mut ContainerNode, workspace: &Workspace) -> Result<(), TransformError> {
        let (name, settings) = match node.kind {
            NodeKind::Clone => ("clone", &self.clone),
            NodeKind::Cache => ("cache", &self.cache),
            _ => return Ok(()),
        };

        let image = if node.container.image.is_empty() {
            settings.image.clone()
        } else {
            std::mem::take(&mut node.container.image)
        };
        let alias = if node.container.alias.is_empty() {
            name.to_string()
        } else {
            std::mem::take(&mut node.container.alias)
        };

        node.container = Container {
            name: name.to_string(),
            alias,
            image,
            working_dir: workspace.path.clone(),
            ..Default::default()
        };
        node.commands.clear();

        if settings.disable && !node.disabled {
            debug!("Disabling {} step by operator setting", name);
            node.disabled = true;
        }
        Ok(())
    }
}
