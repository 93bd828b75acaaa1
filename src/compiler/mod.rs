//! Compiler - parse tree to executable program
//!
//! The program is one list node. The ambassador and services start detached,
//! clone and cache run blocking, then the script steps follow in declared
//! order. A step that later failure handlers depend on is wrapped in an error
//! node whose defer branch runs those handlers.

use crate::core::{Container, Spec};
use crate::parse::{ContainerNode, RootNode};
use crate::transform::Chain;
use crate::tree::{ErrorNode, ListNode, Node, RunNode, ValidationError};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot parse pipeline: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{pass}: {message}")]
    Transform { pass: String, message: String },

    #[error("duplicate name: {0}")]
    DuplicateName(String),

    #[error("invalid program: {0}")]
    Invalid(#[from] ValidationError),
}

/// Turns pipeline definitions into [`Spec`]s using a fixed transform chain
pub struct Compiler {
    chain: Chain,
}

/// Accumulates the [`Spec`] while keeping container names unique
struct Emitter {
    spec: Spec,
    program: ListNode,
    names: HashSet<String>,
}

impl Emitter {
    fn new() -> Self {
        Self {
            spec: Spec::default(),
            program: ListNode::new(),
            names: HashSet::new(),
        }
    }

    fn add_container(&mut self, container: &Container) -> Result<(), CompileError> {
        if !self.names.insert(container.name.clone()) {
            return Err(CompileError::DuplicateName(container.name.clone()));
        }
        self.spec.containers.push(container.clone());
        Ok(())
    }

    /// Add the container and a run node for it to the main sequence
    fn emit(&mut self, node: &ContainerNode, detach: bool, silent: bool) -> Result<(), CompileError> {
        self.add_container(&node.container)?;
        self.program.push(
            RunNode::new(&node.container.name)
                .with_detach(detach)
                .with_silent(silent),
        );
        Ok(())
    }

    fn finish(mut self) -> Spec {
        self.spec.program = self.program.into();
        self.spec
    }
}

impl Compiler {
    pub fn new(chain: Chain) -> Self {
        Self { chain }
    }

    /// Parse, transform and compile a YAML definition
    pub fn compile(&self, yaml: &str) -> Result<Spec, CompileError> {
        let root = RootNode::load(yaml)?;
        self.compile_root(root)
    }

    /// Transform and compile an already parsed definition
    pub fn compile_root(&self, mut root: RootNode) -> Result<Spec, CompileError> {
        self.chain
            .apply(&mut root)
            .map_err(|(pass, e)| CompileError::Transform {
                pass: pass.to_string(),
                message: e.0,
            })?;

        let mut out = Emitter::new();

        if let Some(pod) = root.pod.as_ref().filter(|n| !n.disabled) {
            out.emit(pod, true, true)?;
        }
        if !root.cache.disabled {
            out.emit(&root.cache, false, false)?;
        }
        if !root.clone.disabled {
            out.emit(&root.clone, false, false)?;
        }
        for service in root.services.iter().filter(|n| !n.disabled) {
            out.emit(service, true, false)?;
        }

        let steps: Vec<&ContainerNode> = root.script.iter().filter(|n| !n.disabled).collect();
        for (i, step) in steps.iter().enumerate() {
            out.add_container(&step.container)?;
            if !step.conditions.runs_on_success() {
                continue;
            }

            let run: Node = RunNode::new(&step.container.name).into();
            let handlers: Vec<&str> = steps[i + 1..]
                .iter()
                .filter(|s| s.conditions.runs_on_failure())
                .map(|s| s.container.name.as_str())
                .collect();
            if handlers.is_empty() {
                out.program.push(run);
                continue;
            }

            debug!("Step {} has failure handlers {:?}", step.container.name, handlers);
            let defer = handlers
                .iter()
                .fold(ListNode::new(), |list, name| list.append(RunNode::new(*name)));
            out.program.push(ErrorNode::new(run, defer));
        }

        let mut volumes = HashSet::new();
        for node in &root.volumes {
            if !volumes.insert(node.volume.name.clone()) {
                return Err(CompileError::DuplicateName(node.volume.name.clone()));
            }
            out.spec.volumes.push(node.volume.clone());
        }
        let mut networks = HashSet::new();
        for node in &root.networks {
            if !networks.insert(node.network.name.clone()) {
                return Err(CompileError::DuplicateName(node.network.name.clone()));
            }
            out.spec.networks.push(node.network.clone());
        }

        let spec = out.finish();
        spec.validate()?;
        info!(
            "Compiled pipeline: {} containers, {} top-level nodes",
            spec.containers.len(),
            spec.program.children().len()
        );
        Ok(spec)
    }
}
