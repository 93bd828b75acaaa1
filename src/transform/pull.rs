//! Pull policy for plugin images

use super::{Transform, TransformError};
use crate::parse::{ContainerNode, Workspace};

/// Forces a fresh pull of plugin-like images when the operator asks for it
#[derive(Debug, Clone, Copy)]
pub struct PullTransform {
    pull: bool,
}

impl PullTransform {
    pub fn new(pull: bool) -> Self {
        Self { pull }
    }
}

impl Transform for PullTransform {
    fn name(&self) -> &'static str {
        "pull"
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        if self.pull && node.kind.is_plugin_like() {
            node.container.pull = true;
        }
        Ok(())
    }
}
