//! Trust and plugin restrictions

use super::{Transform, TransformError};
use crate::core::conditions::glob_match;
use crate::core::Container;
use crate::parse::{ContainerNode, NodeKind, Workspace};

/// Rejects capabilities an untrusted pipeline may not use
#[derive(Debug, Clone)]
pub struct ValidateTransform {
    trusted: bool,
    plugins: Vec<String>,
}

impl ValidateTransform {
    pub fn new(trusted: bool, plugins: Vec<String>) -> Self {
        Self { trusted, plugins }
    }

    fn validate_plugin_image(&self, container: &Container) -> Result<(), TransformError> {
        let name = container.image_name();
        if self
            .plugins
            .iter()
            .any(|p| glob_match(p, &container.image) || glob_match(p, name))
        {
            return Ok(());
        }
        Err(TransformError::new(format!(
            "Plugin {} is not in the allow-list",
            container.image
        )))
    }

    fn validate_plugin_config(&self, container: &Container) -> Result<(), TransformError> {
        if !container.entrypoint.is_empty() {
            return Err(TransformError::new(format!(
                "Cannot override the entrypoint of plugin {}",
                container.name
            )));
        }
        if !container.command.is_empty() {
            return Err(TransformError::new(format!(
                "Cannot override the command of plugin {}",
                container.name
            )));
        }
        Ok(())
    }

    fn validate_trust(&self, c: &Container) -> Result<(), TransformError> {
        if self.trusted {
            return Ok(());
        }
        let denied = if c.privileged {
            Some("privileged mode")
        } else if !c.dns.is_empty() {
            Some("custom dns")
        } else if !c.dns_search.is_empty() {
            Some("custom dns_search")
        } else if !c.devices.is_empty() {
            Some("devices")
        } else if !c.extra_hosts.is_empty() {
            Some("extra_hosts")
        } else if !c.network.is_empty() {
            Some("custom network_mode")
        } else if c.oom_kill_disable {
            Some("oom_kill_disable")
        } else if !c.volumes.is_empty() {
            Some("volumes")
        } else if !c.volumes_from.is_empty() {
            Some("volumes_from")
        } else {
            None
        };
        match denied {
            Some(what) => Err(TransformError::new(format!(
                "Insufficient privileges to use {} in step {}",
                what, c.name
            ))),
            None => Ok(()),
        }
    }
}

impl Transform for ValidateTransform {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        if node.disabled {
            return Ok(());
        }
        if node.kind.is_plugin_like() {
            self.validate_plugin_image(&node.container)?;
        }
        if node.kind == NodeKind::Plugin {
            self.validate_plugin_config(&node.container)?;
        }
        self.validate_trust(&node.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(trusted: bool, kind: NodeKind, container: Container) -> Result<(), TransformError> {
        let mut node = ContainerNode::new(kind, container);
        ValidateTransform::new(trusted, vec!["plugins/*".into()])
            .visit_container(&mut node, &Workspace::default())
    }

    fn privileged() -> Container {
        Container {
            privileged: true,
            ..Container::new("build", "docker:dind")
        }
    }

    #[test]
    fn test_privileged_requires_trust() {
        let err = check(false, NodeKind::Shell, privileged()).unwrap_err();
        assert!(err.to_string().contains("privileged mode"));
        assert!(check(true, NodeKind::Shell, privileged()).is_ok());
    }

    #[test]
    fn test_each_restricted_field() {
        let base = || Container::new("step", "alpine:latest");
        let cases = vec![
            (Container { dns: vec!["8.8.8.8".into()], ..base() }, "custom dns"),
            (Container { dns_search: vec!["corp".into()], ..base() }, "dns_search"),
            (Container { devices: vec!["/dev/fuse".into()], ..base() }, "devices"),
            (Container { extra_hosts: vec!["a:1.2.3.4".into()], ..base() }, "extra_hosts"),
            (Container { network: "host".into(), ..base() }, "network_mode"),
            (Container { oom_kill_disable: true, ..base() }, "oom_kill_disable"),
            (Container { volumes: vec!["/tmp:/tmp".into()], ..base() }, "volumes"),
            (Container { volumes_from: vec!["other".into()], ..base() }, "volumes_from"),
        ];
        for (container, expected) in cases {
            let err = check(false, NodeKind::Shell, container.clone()).unwrap_err();
            assert!(err.to_string().contains(expected), "{} vs {}", err, expected);
            assert!(check(true, NodeKind::Shell, container).is_ok());
        }
    }

    #[test]
    fn test_plugin_entrypoint_rejected() {
        let c = Container {
            entrypoint: vec!["/bin/sh".into()],
            ..Container::new("notify", "plugins/slack:latest")
        };
        let err = check(true, NodeKind::Plugin, c).unwrap_err();
        assert!(err.to_string().contains("entrypoint"));

        let c = Container {
            command: vec!["rm -rf /".into()],
            ..Container::new("notify", "plugins/slack:latest")
        };
        assert!(check(true, NodeKind::Plugin, c).is_err());
    }

    #[test]
    fn test_plugin_allow_list() {
        assert!(check(false, NodeKind::Plugin, Container::new("n", "plugins/slack:latest")).is_ok());
        let err = check(false, NodeKind::Plugin, Container::new("n", "evil/slack:latest")).unwrap_err();
        assert!(err.to_string().contains("allow-list"));
        assert!(check(false, NodeKind::Clone, Container::new("clone", "evil/git:latest")).is_err());
    }

    #[test]
    fn test_disabled_nodes_skipped() {
        let mut node = ContainerNode::new(NodeKind::Shell, privileged());
        node.disabled = true;
        assert!(ValidateTransform::new(false, vec![])
            .visit_container(&mut node, &Workspace::default())
            .is_ok());
    }
}
