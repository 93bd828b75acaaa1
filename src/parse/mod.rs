//! Definition parser - YAML to parse tree
//!
//! The parse tree keeps every section of the definition, including steps that
//! later passes disable, so transforms see a uniform shape.

pub mod types;
mod yaml;

use crate::core::{Conditions, Container, Network, Volume};
use crate::transform::{Transform, TransformError};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Kind of a container node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plain container, e.g. the ambassador
    Container,
    /// Script step delegating to a plugin image
    Plugin,
    /// Script step running inline commands
    Shell,
    /// Long-running service started in the background
    Service,
    Clone,
    Cache,
}

impl NodeKind {
    /// Plugin-like nodes are configured through `PLUGIN_*` variables
    pub fn is_plugin_like(&self) -> bool {
        matches!(self, NodeKind::Plugin | NodeKind::Clone | NodeKind::Cache)
    }
}

/// A container in the parse tree
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerNode {
    pub kind: NodeKind,
    pub container: Container,
    pub conditions: Conditions,

    /// Skipped at compile time but kept in the tree
    pub disabled: bool,

    /// Inline commands, shell steps only
    pub commands: Vec<String>,

    /// Free-form plugin arguments in declaration order
    pub vargs: IndexMap<String, Value>,
}

impl ContainerNode {
    pub fn new(kind: NodeKind, container: Container) -> Self {
        Self {
            kind,
            container,
            conditions: Conditions::default(),
            disabled: false,
            commands: Vec::new(),
            vargs: IndexMap::new(),
        }
    }
}

/// Image build settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildNode {
    pub context: String,
    pub dockerfile: String,
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeNode {
    pub volume: Volume,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkNode {
    pub network: Network,
}

/// Where the repository is checked out inside containers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub base: String,
    pub path: String,
}

/// Root of the parse tree
#[derive(Debug, Clone, PartialEq)]
pub struct RootNode {
    pub image: String,
    pub platform: String,
    pub workspace: Workspace,
    pub build: BuildNode,

    /// Ambassador container, added by the pod pass
    pub pod: Option<ContainerNode>,
    pub clone: ContainerNode,
    pub cache: ContainerNode,
    pub services: Vec<ContainerNode>,
    pub script: Vec<ContainerNode>,
    pub volumes: Vec<VolumeNode>,
    pub networks: Vec<NetworkNode>,
}

impl Default for RootNode {
    fn default() -> Self {
        let mut cache = ContainerNode::new(NodeKind::Cache, Container::default());
        cache.disabled = true;
        Self {
            image: String::new(),
            platform: String::new(),
            workspace: Workspace::default(),
            build: BuildNode::default(),
            pod: None,
            clone: ContainerNode::new(NodeKind::Clone, Container::default()),
            cache,
            services: Vec::new(),
            script: Vec::new(),
            volumes: Vec::new(),
            networks: Vec::new(),
        }
    }
}

impl RootNode {
    /// Parse a pipeline definition
    pub fn load(yaml: &str) -> Result<Self, serde_yaml::Error> {
        yaml::load(yaml)
    }

    /// Apply one transform to every node
    ///
    /// The root is visited first, then build, pod, clone, cache, services,
    /// script, volumes and networks. The first error stops the walk.
    pub fn walk(&mut self, pass: &dyn Transform) -> Result<(), TransformError> {
        pass.visit_root(self)?;
        pass.visit_build(&mut self.build)?;

        let workspace = &self.workspace;
        let containers = self
            .pod
            .iter_mut()
            .chain(std::iter::once(&mut self.clone))
            .chain(std::iter::once(&mut self.cache))
            .chain(self.services.iter_mut())
            .chain(self.script.iter_mut());
        for node in containers {
            pass.visit_container(node, workspace)?;
        }

        for node in &mut self.volumes {
            pass.visit_volume(node)?;
        }
        for node in &mut self.networks {
            pass.visit_network(node)?;
        }
        Ok(())
    }
}
