//! Workspace defaults

use super::{Transform, TransformError};
use crate::parse::{ContainerNode, NodeKind, RootNode, Workspace};
use std::path::Path;

/// Platform assumed when the pipeline does not name one
pub const DEFAULT_PLATFORM: &str = "linux/amd64";

/// Fills the workspace base and path and points containers at it
#[derive(Debug, Clone)]
pub struct WorkspaceTransform {
    base: String,
    path: String,
}

impl WorkspaceTransform {
    pub fn new(base: &str, path: &str) -> Self {
        Self {
            base: base.to_string(),
            path: path.to_string(),
        }
    }
}

impl Transform for WorkspaceTransform {
    fn name(&self) -> &'static str {
        "workspace"
    }

    fn visit_root(&self, root: &mut RootNode) -> Result<(), TransformError> {
        if root.workspace.base.is_empty() {
            root.workspace.base = self.base.clone();
        }
        if root.workspace.path.is_empty() {
            root.workspace.path = self.path.clone();
        }
        if !root.workspace.path.starts_with('/') {
            root.workspace.path = Path::new(&root.workspace.base)
                .join(&root.workspace.path)
                .to_string_lossy()
                .into_owned();
        }
        if root.platform.is_empty() {
            root.platform = DEFAULT_PLATFORM.to_string();
        }
        Ok(())
    }

    fn visit_container(&self, node: &mut ContainerNode, workspace: &Workspace) -> Result<(), TransformError> {
        if node.kind == NodeKind::Service {
            return Ok(());
        }
        if node.container.working_dir.is_empty() {
            node.container.working_dir = workspace.path.clone();
        }
        Ok(())
    }
}
