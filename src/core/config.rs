//! Operator configuration loaded from YAML

use crate::core::conditions::glob_match;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default namespace prepended to bare plugin images
pub const DEFAULT_NAMESPACE: &str = "plugins";

/// Operator-level settings that shape how pipelines are compiled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace for plugin images given without an owner
    pub namespace: String,

    /// Image globs granted privileged mode
    pub escalate: Vec<String>,

    /// Image globs plugins must match
    pub plugins: Vec<String>,

    /// Always pull plugin images
    pub pull: bool,

    /// Workspace defaults
    pub workspace: WorkspaceConfig,

    /// Environment variables copied into every container
    pub environment: BTreeMap<String, String>,

    /// Secrets injected into matching containers
    pub secrets: Vec<Secret>,

    /// Clone step settings
    pub clone: PluginConfig,

    /// Cache step settings
    pub cache: PluginConfig,

    /// Run an ambassador container that shares its namespace with every step
    pub pod: bool,

    /// Proxy settings injected into every container
    pub proxy: ProxyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            escalate: vec![
                "plugins/docker".to_string(),
                "plugins/gcr".to_string(),
                "plugins/ecr".to_string(),
            ],
            plugins: vec!["*".to_string()],
            pull: false,
            workspace: WorkspaceConfig::default(),
            environment: BTreeMap::new(),
            secrets: Vec::new(),
            clone: PluginConfig::default(),
            cache: PluginConfig::default(),
            pod: false,
            proxy: ProxyConfig::default(),
        }
    }
}

/// Workspace defaults used when the pipeline omits them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub base: String,
    pub path: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base: "/drone".to_string(),
            path: "src".to_string(),
        }
    }
}

/// Settings for a built-in plugin step (clone or cache)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Image override; the built-in default is used when empty
    pub image: Option<String>,

    /// Disable the step regardless of the pipeline
    pub disable: bool,
}

/// HTTP proxy settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxyConfig {
    /// Read proxy settings from the process environment
    ///
    /// Called once at startup; transforms receive the resulting value.
    pub fn from_env() -> Self {
        let lookup = |upper: &str, lower: &str| {
            std::env::var(upper)
                .or_else(|_| std::env::var(lower))
                .ok()
                .filter(|v| !v.is_empty())
        };
        Self {
            http: lookup("HTTP_PROXY", "http_proxy"),
            https: lookup("HTTPS_PROXY", "https_proxy"),
            no_proxy: lookup("NO_PROXY", "no_proxy"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none() && self.no_proxy.is_none()
    }

    /// Fill unset values from another config
    pub fn or(self, other: ProxyConfig) -> Self {
        Self {
            http: self.http.or(other.http),
            https: self.https.or(other.https),
            no_proxy: self.no_proxy.or(other.no_proxy),
        }
    }
}

/// A secret exposed to containers whose image and event match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value: String,

    /// Image globs allowed to receive the secret
    #[serde(default)]
    pub images: Vec<String>,

    /// Events allowed to receive the secret
    #[serde(default)]
    pub events: Vec<String>,
}

impl Secret {
    pub fn matches(&self, image: &str, event: &str) -> bool {
        self.matches_image(image) && self.matches_event(event)
    }

    pub fn matches_image(&self, image: &str) -> bool {
        let name = crate::core::container::trim_image_tag(image);
        self.images
            .iter()
            .any(|p| p == "*" || glob_match(p, image) || glob_match(p, name))
    }

    pub fn matches_event(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == "*" || e == event)
    }

    /// Name of the environment variable holding the secret
    pub fn env_name(&self) -> String {
        self.name.to_uppercase()
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Default location: `<config dir>/cinder/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cinder").join("config.yaml"))
    }

    /// Load from an explicit path, else the default path if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.namespace.contains('/') {
            anyhow::bail!("Namespace must not contain '/': {}", self.namespace);
        }

        let mut seen = std::collections::HashSet::new();
        for secret in &self.secrets {
            if secret.name.is_empty() {
                anyhow::bail!("Secret with empty name");
            }
            if !seen.insert(secret.env_name()) {
                anyhow::bail!("Duplicate secret: {}", secret.name);
            }
        }

        if !self.workspace.base.starts_with('/') {
            anyhow::bail!("Workspace base must be absolute: {}", self.workspace.base);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.namespace, "plugins");
        assert_eq!(config.plugins, vec!["*"]);
        assert_eq!(config.workspace.base, "/drone");
        assert!(!config.pod);
    }

    #[test]
    fn test_parse_full() {
        let yaml = r#"
namespace: acme
escalate: ["acme/docker"]
pull: true
environment:
  CI: "true"
secrets:
  - name: docker_password
    value: hunter2
    images: ["acme/docker"]
    events: [push, tag]
clone:
  image: acme/git:2
cache:
  disable: true
proxy:
  http: http://proxy:3128
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.namespace, "acme");
        assert!(config.pull);
        assert_eq!(config.environment.get("CI").map(String::as_str), Some("true"));
        assert_eq!(config.secrets[0].env_name(), "DOCKER_PASSWORD");
        assert_eq!(config.clone.image.as_deref(), Some("acme/git:2"));
        assert!(config.cache.disable);
        assert_eq!(config.proxy.http.as_deref(), Some("http://proxy:3128"));
    }

    #[test]
    fn test_duplicate_secret_rejected() {
        let yaml = r#"
secrets:
  - {name: token, value: a}
  - {name: TOKEN, value: b}
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate secret"));
    }

    #[test]
    fn test_relative_base_rejected() {
        assert!(Config::from_yaml("workspace: {base: drone}").is_err());
    }

    #[test]
    fn test_secret_matching() {
        let secret = Secret {
            name: "token".into(),
            value: "x".into(),
            images: vec!["plugins/*".into()],
            events: vec!["push".into()],
        };
        assert!(secret.matches("plugins/slack:latest", "push"));
        assert!(!secret.matches("plugins/slack:latest", "pull_request"));
        assert!(!secret.matches("golang:latest", "push"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespace: corp\npod: true").unwrap();

        let config = Config::discover(Some(file.path())).unwrap();
        assert_eq!(config.namespace, "corp");
        assert!(config.pod);
    }

    #[test]
    fn test_proxy_or() {
        let a = ProxyConfig { http: Some("a".into()), ..Default::default() };
        let b = ProxyConfig { http: Some("b".into()), https: Some("c".into()), no_proxy: None };
        let merged = a.or(b);
        assert_eq!(merged.http.as_deref(), Some("a"));
        assert_eq!(merged.https.as_deref(), Some("c"));
        assert!(!merged.is_empty());
    }
}
