//! Container, volume and network definitions shared by the compiler and runner

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alias given to the shared-namespace helper container
pub const AMBASSADOR_ALIAS: &str = "ambassador";

/// A runtime unit handed to the container engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Unique name within a spec
    pub name: String,

    /// Display name used to prefix log lines
    #[serde(default)]
    pub alias: String,

    /// Image reference, including tag once normalized
    pub image: String,

    /// Always pull the image before starting
    #[serde(default, skip_serializing_if = "is_false")]
    pub pull: bool,

    /// Registry credentials
    #[serde(default, skip_serializing_if = "Auth::is_empty")]
    pub auth_config: Auth,

    #[serde(default, skip_serializing_if = "is_false")]
    pub privileged: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_dir: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes_from: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,

    /// Network mode, e.g. `bridge` or `container:<name>`
    #[serde(default, rename = "network_mode", skip_serializing_if = "String::is_empty")]
    pub network: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_search: Vec<String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub memswap_limit: i64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub mem_limit: i64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub cpu_quota: i64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub cpu_shares: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpuset: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub oom_kill_disable: bool,

    /// Set only on the shared-namespace helper added by the pod pass
    #[serde(default, skip_serializing_if = "is_false")]
    pub ambassador: bool,
}

impl Container {
    /// Create a container with a name and image
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            image: image.into(),
            ..Default::default()
        }
    }

    /// Check the invariants required before the engine may start the container
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("container name is empty".to_string());
        }
        if self.image.is_empty() {
            return Err(format!("container {} has no image", self.name));
        }
        Ok(())
    }

    /// Whether this is the shared-namespace helper added by the pod pass
    pub fn is_ambassador(&self) -> bool {
        self.ambassador
    }

    /// Image name without its tag, e.g. `plugins/docker` for `plugins/docker:1.2`
    pub fn image_name(&self) -> &str {
        trim_image_tag(&self.image)
    }
}

/// Strip the tag or digest (but not a registry port) from an image reference
pub fn trim_image_tag(image: &str) -> &str {
    let image = image.split('@').next().unwrap_or(image);
    let slash = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[slash..].find(':') {
        Some(colon) => &image[..slash + colon],
        None => image,
    }
}

/// Whether an image reference carries an explicit tag
pub fn has_image_tag(image: &str) -> bool {
    let last = image.rsplit('/').next().unwrap_or(image);
    last.contains(':') || last.contains('@')
}

/// Registry credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl Auth {
    pub fn is_empty(&self) -> bool {
        self.username.is_empty()
            && self.password.is_empty()
            && self.email.is_empty()
            && self.token.is_empty()
    }
}

/// A named volume created for the build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub driver_opts: BTreeMap<String, String>,
}

/// A named network created for the build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub driver_opts: BTreeMap<String, String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}
