//! Ambassador container shared by every step
//!
//! The ambassador holds the workspace volume and the network namespace; the
//! other containers join it instead of each creating their own.

use super::{Transform, TransformError};
use crate::core::container::AMBASSADOR_ALIAS;
use crate::core::Container;
use crate::parse::{ContainerNode, NodeKind, RootNode, Workspace};
use uuid::Uuid;

pub const AMBASSADOR_IMAGE: &str = "busybox:latest";

#[derive(Debug, Clone)]
pub struct PodTransform {
    prefix: String,
}

impl Default for PodTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl PodTransform {
    /// Use a random name prefix so concurrent builds do not collide
    pub fn new() -> Self {
        Self::with_prefix(format!("cinder_{}", Uuid::new_v4().simple()))
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn ambassador_name(&self) -> String {
        format!("{}_{}", self.prefix, AMBASSADOR_ALIAS)
    }
}

impl Transform for PodTransform {
    fn name(&self) -> &'static str {
        "pod"
    }

    fn visit_root(&self, root: &mut RootNode) -> Result<(), TransformError> {
        let container = Container {
            alias: AMBASSADOR_ALIAS.to_string(),
            entrypoint: vec!["/bin/sleep".to_string()],
            command: vec!["86400".to_string()],
            volumes: vec![root.workspace.base.clone()],
            ambassador: true,
            ..Container::new(self.ambassador_name(), AMBASSADOR_IMAGE)
        };
        root.pod = Some(ContainerNode::new(NodeKind::Container, container));
        Ok(())
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        if node.disabled || node.container.is_ambassador() {
            return Ok(());
        }
        let name = self.ambassador_name();
        let c = &mut node.container;
        if c.network.is_empty() {
            c.network = format!("container:{}", name);
        }
        if !c.volumes_from.contains(&name) {
            c.volumes_from.push(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambassador_added_and_joined() {
        let mut root = RootNode::load("script:\n  test: {image: golang, commands: [go test]}\n").unwrap();
        root.workspace.base = "/drone".into();
        root.walk(&PodTransform::with_prefix("build1")).unwrap();

        let pod = root.pod.as_ref().unwrap();
        assert_eq!(pod.container.name, "build1_ambassador");
        assert!(pod.container.is_ambassador());
        assert_eq!(pod.container.image, AMBASSADOR_IMAGE);
        assert_eq!(pod.container.volumes, vec!["/drone"]);
        assert!(pod.container.volumes_from.is_empty());

        let step = &root.script[0].container;
        assert_eq!(step.network, "container:build1_ambassador");
        assert_eq!(step.volumes_from, vec!["build1_ambassador"]);
    }

    #[test]
    fn test_unique_prefix() {
        assert_ne!(PodTransform::new().prefix, PodTransform::new().prefix);
    }
}
