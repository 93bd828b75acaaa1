//! Transform chain - ordered passes over the parse tree
//!
//! Each pass implements [`Transform`] and only overrides the hooks it needs.
//! A pass may rewrite node fields, soft-disable a container node, or return an
//! error that aborts the whole compile.
//!
//! [`Chain::standard`] builds the passes in this order:
//!
//! 1. workspace: default base, path and platform; working dirs
//! 2. plugin: clone/cache defaults, strip user attributes
//! 3. normalize: names, image tags, plugin namespace, drivers
//! 4. filter: branch/event/platform/environment/matrix/status
//! 5. validate: trust restrictions and plugin allow-list
//! 6. escalate: privileged mode for allow-listed images
//! 7. environ: default environment and proxy variables
//! 8. secrets: matching secrets as environment variables
//! 9. args: plugin arguments to `PLUGIN_*` variables
//! 10. pull: pull policy for plugin-like nodes
//! 11. shell: inline commands to an encoded script
//! 12. pod: ambassador container (when enabled)
//!
//! Validation runs before escalate, environ and pod, so it only sees what the
//! pipeline author wrote, not what the operator grants.

pub mod args;
pub mod environ;
pub mod escalate;
pub mod filter;
pub mod normalize;
pub mod plugin;
pub mod pod;
pub mod pull;
pub mod secret;
pub mod shell;
pub mod validate;
pub mod workspace;

use crate::core::{Config, RunContext};
use crate::parse::{BuildNode, ContainerNode, NetworkNode, RootNode, VolumeNode, Workspace};
use thiserror::Error;
use tracing::debug;

pub use args::ArgsTransform;
pub use environ::EnvironTransform;
pub use escalate::EscalateTransform;
pub use filter::FilterTransform;
pub use normalize::NormalizeTransform;
pub use plugin::PluginTransform;
pub use pod::PodTransform;
pub use pull::PullTransform;
pub use secret::SecretTransform;
pub use shell::ShellTransform;
pub use validate::ValidateTransform;
pub use workspace::WorkspaceTransform;

/// Error returned by a pass; aborts the compile
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A pass over the parse tree
pub trait Transform: Send + Sync {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    fn visit_root(&self, _root: &mut RootNode) -> Result<(), TransformError> {
        Ok(())
    }

    fn visit_build(&self, _node: &mut BuildNode) -> Result<(), TransformError> {
        Ok(())
    }

    fn visit_container(
        &self,
        _node: &mut ContainerNode,
        _workspace: &Workspace,
    ) -> Result<(), TransformError> {
        Ok(())
    }

    fn visit_volume(&self, _node: &mut VolumeNode) -> Result<(), TransformError> {
        Ok(())
    }

    fn visit_network(&self, _node: &mut NetworkNode) -> Result<(), TransformError> {
        Ok(())
    }
}

/// An ordered list of passes
#[derive(Default)]
pub struct Chain {
    passes: Vec<Box<dyn Transform>>,
}

impl Chain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass, builder style
    pub fn with(mut self, pass: impl Transform + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// The documented pass order, configured from operator settings and the run
    pub fn standard(config: &Config, context: &RunContext) -> Self {
        let mut chain = Chain::new()
            .with(WorkspaceTransform::new(&config.workspace.base, &config.workspace.path))
            .with(PluginTransform::from_config(config))
            .with(NormalizeTransform::new(&config.namespace))
            .with(FilterTransform::new(context.clone()))
            .with(ValidateTransform::new(context.trusted, config.plugins.clone()))
            .with(EscalateTransform::new(config.escalate.clone()))
            .with(EnvironTransform::new(config.environment.clone(), config.proxy.clone()))
            .with(SecretTransform::new(config.secrets.clone(), &context.event))
            .with(ArgsTransform)
            .with(PullTransform::new(config.pull))
            .with(ShellTransform);
        if config.pod {
            chain = chain.with(PodTransform::new());
        }
        chain
    }

    /// Names of the passes in order
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over the tree; the first failure aborts with the pass name
    pub fn apply(&self, root: &mut RootNode) -> Result<(), (&'static str, TransformError)> {
        for pass in &self.passes {
            debug!("Applying transform: {}", pass.name());
            root.walk(pass.as_ref()).map_err(|e| (pass.name(), e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Transform for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn visit_root(&self, _root: &mut RootNode) -> Result<(), TransformError> {
            self.seen.lock().unwrap().push("root".into());
            Ok(())
        }

        fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
            self.seen.lock().unwrap().push(format!("{:?}:{}", node.kind, node.container.name));
            Ok(())
        }
    }

    struct Fails;

    impl Transform for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }

        fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
            if node.container.name == "bad" {
                return Err(TransformError::new("bad step"));
            }
            node.container.image = "touched".into();
            Ok(())
        }
    }

    #[test]
    fn test_walk_order() {
        let mut root = RootNode::load("services:\n  db: {image: postgres}\nscript:\n  test: {image: golang, commands: [go test]}\n").unwrap();
        let recorder = Recorder { seen: Mutex::new(Vec::new()) };
        root.walk(&recorder).unwrap();
        assert_eq!(
            recorder.seen.into_inner().unwrap(),
            vec!["root", "Clone:", "Cache:", "Service:db", "Shell:test"]
        );
    }

    #[test]
    fn test_error_aborts_with_pass_name() {
        let mut root = RootNode::load("script:\n  bad: {image: a}\n  later: {image: b}\n").unwrap();
        let chain = Chain::new().with(Fails);
        let (pass, err) = chain.apply(&mut root).unwrap_err();
        assert_eq!(pass, "fails");
        assert_eq!(err.to_string(), "bad step");
        assert_eq!(root.script[1].container.image, "b");
    }

    #[test]
    fn test_standard_order() {
        let chain = Chain::standard(&Config::default(), &RunContext::default());
        assert_eq!(
            chain.names(),
            vec![
                "workspace", "plugin", "normalize", "filter", "validate", "escalate",
                "environ", "secrets", "args", "pull", "shell"
            ]
        );

        let config = Config { pod: true, ..Config::default() };
        let chain = Chain::standard(&config, &RunContext::default());
        assert_eq!(chain.names().last(), Some(&"pod"));
    }
}
