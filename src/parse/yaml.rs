//! Raw YAML shapes and their conversion into parse-tree nodes

use super::types::{MapEqualSlice, StringOrSlice};
use super::{BuildNode, ContainerNode, NetworkNode, NodeKind, RootNode, VolumeNode, Workspace};
use crate::core::{Auth, Conditions, Container, Network, Volume};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize)]
struct RawRoot {
    #[serde(default)]
    image: String,
    #[serde(default)]
    platform: String,
    #[serde(default)]
    workspace: RawWorkspace,
    #[serde(default)]
    build: Option<RawBuild>,
    #[serde(default)]
    clone: Option<RawContainer>,
    #[serde(default)]
    cache: Option<RawContainer>,
    #[serde(default)]
    services: IndexMap<String, RawContainer>,
    #[serde(default)]
    script: IndexMap<String, RawContainer>,
    #[serde(default)]
    volumes: IndexMap<String, Option<RawDriver>>,
    #[serde(default)]
    networks: IndexMap<String, Option<RawDriver>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWorkspace {
    #[serde(default)]
    base: String,
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBuild {
    Context(String),
    Full {
        #[serde(default)]
        context: String,
        #[serde(default)]
        dockerfile: String,
        #[serde(default)]
        args: MapEqualSlice,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawDriver {
    #[serde(default)]
    driver: String,
    #[serde(default)]
    driver_opts: BTreeMap<String, String>,
}

/// A container entry; unknown keys are collected as plugin arguments
#[derive(Debug, Default, Deserialize)]
struct RawContainer {
    #[serde(default)]
    image: String,
    #[serde(default)]
    pull: bool,
    #[serde(default)]
    auth_config: Auth,
    #[serde(default)]
    privileged: bool,
    #[serde(default)]
    environment: MapEqualSlice,
    #[serde(default)]
    entrypoint: StringOrSlice,
    #[serde(default)]
    command: StringOrSlice,
    #[serde(default)]
    commands: StringOrSlice,
    #[serde(default)]
    extra_hosts: StringOrSlice,
    #[serde(default)]
    volumes: StringOrSlice,
    #[serde(default)]
    volumes_from: StringOrSlice,
    #[serde(default)]
    devices: StringOrSlice,
    #[serde(default)]
    network_mode: String,
    #[serde(default)]
    dns: StringOrSlice,
    #[serde(default)]
    dns_search: StringOrSlice,
    #[serde(default)]
    memswap_limit: i64,
    #[serde(default)]
    mem_limit: i64,
    #[serde(default)]
    cpu_quota: i64,
    #[serde(default)]
    cpu_shares: i64,
    #[serde(default)]
    cpuset: String,
    #[serde(default)]
    oom_kill_disable: bool,
    #[serde(default)]
    when: Conditions,
    #[serde(flatten)]
    vargs: IndexMap<String, Value>,
}

impl RawContainer {
    fn into_node(self, kind: NodeKind, name: &str) -> ContainerNode {
        let container = Container {
            name: name.to_string(),
            alias: name.to_string(),
            image: self.image,
            pull: self.pull,
            auth_config: self.auth_config,
            privileged: self.privileged,
            environment: self.environment.into_map(),
            entrypoint: self.entrypoint.into_vec(),
            command: self.command.into_vec(),
            extra_hosts: self.extra_hosts.into_vec(),
            volumes: self.volumes.into_vec(),
            volumes_from: self.volumes_from.into_vec(),
            devices: self.devices.into_vec(),
            network: self.network_mode,
            dns: self.dns.into_vec(),
            dns_search: self.dns_search.into_vec(),
            memswap_limit: self.memswap_limit,
            mem_limit: self.mem_limit,
            cpu_quota: self.cpu_quota,
            cpu_shares: self.cpu_shares,
            cpuset: self.cpuset,
            oom_kill_disable: self.oom_kill_disable,
            ..Default::default()
        };

        let mut node = ContainerNode::new(kind, container);
        node.conditions = self.when;
        node.commands = self.commands.into_vec();
        node.vargs = self.vargs;
        node
    }
}

pub(super) fn load(yaml: &str) -> Result<RootNode, serde_yaml::Error> {
    let raw: RawRoot = if yaml.trim().is_empty() {
        RawRoot::default()
    } else {
        serde_yaml::from_str(yaml)?
    };

    let mut root = RootNode {
        image: raw.image,
        platform: raw.platform,
        workspace: Workspace {
            base: raw.workspace.base,
            path: raw.workspace.path,
        },
        ..Default::default()
    };

    root.build = match raw.build {
        Some(RawBuild::Context(context)) => BuildNode {
            context,
            ..Default::default()
        },
        Some(RawBuild::Full { context, dockerfile, args }) => BuildNode {
            context,
            dockerfile,
            args: args.into_map(),
        },
        None => BuildNode::default(),
    };

    if let Some(clone) = raw.clone {
        let mut node = clone.into_node(NodeKind::Clone, "");
        if let Some(disable) = node.vargs.shift_remove("disable") {
            node.disabled = disable.as_bool().unwrap_or(false);
        }
        root.clone = node;
    }

    if let Some(cache) = raw.cache {
        root.cache = cache.into_node(NodeKind::Cache, "");
    }

    root.services = raw
        .services
        .into_iter()
        .map(|(name, raw)| raw.into_node(NodeKind::Service, &name))
        .collect();

    root.script = raw
        .script
        .into_iter()
        .map(|(name, raw)| {
            let kind = if raw.commands.0.is_empty() {
                NodeKind::Plugin
            } else {
                NodeKind::Shell
            };
            raw.into_node(kind, &name)
        })
        .collect();

    root.volumes = raw
        .volumes
        .into_iter()
        .map(|(name, raw)| {
            let raw = raw.unwrap_or_default();
            VolumeNode {
                volume: Volume {
                    name,
                    driver: raw.driver,
                    driver_opts: raw.driver_opts,
                },
            }
        })
        .collect();

    root.networks = raw
        .networks
        .into_iter()
        .map(|(name, raw)| {
            let raw = raw.unwrap_or_default();
            NetworkNode {
                network: Network {
                    name,
                    driver: raw.driver,
                    driver_opts: raw.driver_opts,
                },
            }
        })
        .collect();

    Ok(root)
}
