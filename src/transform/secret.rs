//! Secret injection

use super::{Transform, TransformError};
use crate::core::Secret;
use crate::parse::{ContainerNode, Workspace};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SecretTransform {
    secrets: Vec<Secret>,
    event: String,
}

impl SecretTransform {
    pub fn new(secrets: Vec<Secret>, event: &str) -> Self {
        Self {
            secrets,
            event: event.to_string(),
        }
    }
}

impl Transform for SecretTransform {
    fn name(&self) -> &'static str {
        "secrets"
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        if node.disabled {
            return Ok(());
        }
        for secret in &self.secrets {
            if !secret.matches(&node.container.image, &self.event) {
                continue;
            }
            debug!("Injecting secret {} into {}", secret.name, node.container.name);
            node.container
                .environment
                .insert(secret.env_name(), secret.value.clone());
        }
        Ok(())
    }
}
