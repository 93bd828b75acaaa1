//! Default environment and proxy variables

use super::{Transform, TransformError};
use crate::core::ProxyConfig;
use crate::parse::{ContainerNode, Workspace};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct EnvironTransform {
    envs: BTreeMap<String, String>,
}

impl EnvironTransform {
    /// Proxy settings are passed in explicitly; see [`ProxyConfig::from_env`]
    pub fn new(defaults: BTreeMap<String, String>, proxy: ProxyConfig) -> Self {
        let mut envs = defaults;
        let pairs = [
            ("HTTP_PROXY", proxy.http),
            ("HTTPS_PROXY", proxy.https),
            ("NO_PROXY", proxy.no_proxy),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                envs.insert(key.to_lowercase(), value.clone());
                envs.insert(key.to_string(), value);
            }
        }
        Self { envs }
    }
}

impl Transform for EnvironTransform {
    fn name(&self) -> &'static str {
        "environ"
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        for (key, value) in &self.envs {
            node.container.environment.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Container;
    use crate::parse::NodeKind;

    #[test]
    fn test_defaults_and_proxy() {
        let mut defaults = BTreeMap::new();
        defaults.insert("CI".to_string(), "true".to_string());
        let proxy = ProxyConfig {
            http: Some("http://proxy:3128".into()),
            https: None,
            no_proxy: Some("localhost".into()),
        };

        let mut node = ContainerNode::new(NodeKind::Shell, Container::new("test", "golang"));
        node.container.environment.insert("CI".into(), "false".into());
        EnvironTransform::new(defaults, proxy)
            .visit_container(&mut node, &Workspace::default())
            .unwrap();

        let env = &node.container.environment;
        assert_eq!(env["CI"], "true");
        assert_eq!(env["HTTP_PROXY"], "http://proxy:3128");
        assert_eq!(env["http_proxy"], "http://proxy:3128");
        assert_eq!(env["NO_PROXY"], "localhost");
        assert_eq!(env["no_proxy"], "localhost");
        assert!(!env.contains_key("HTTPS_PROXY"));
    }
}
