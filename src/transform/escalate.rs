//! Privileged mode for operator-approved images (docker-in-docker plugins)

use super::{Transform, TransformError};
use crate::core::conditions::glob_match;
use crate::parse::{ContainerNode, Workspace};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct EscalateTransform {
    images: Vec<String>,
}

impl EscalateTransform {
    pub fn new(images: Vec<String>) -> Self {
        Self { images }
    }
}

impl Transform for EscalateTransform {
    fn name(&self) -> &'static str {
        "escalate"
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        let image = &node.container.image;
        let name = node.container.image_name();
        if self
            .images
            .iter()
            .any(|p| glob_match(p, image) || glob_match(p, name))
        {
            debug!("Escalating {} to privileged mode", node.container.name);
            node.container.privileged = true;
        }
        Ok(())
    }
}
