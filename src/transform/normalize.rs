//! Name, image and driver normalization

use super::{Transform, TransformError};
use crate::core::container::{has_image_tag, trim_image_tag};
use crate::parse::{ContainerNode, NetworkNode, VolumeNode, Workspace};

pub const DEFAULT_VOLUME_DRIVER: &str = "local";
pub const DEFAULT_NETWORK_DRIVER: &str = "bridge";

#[derive(Debug, Clone)]
pub struct NormalizeTransform {
    namespace: String,
}

impl NormalizeTransform {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }
}

/// Expand a bare plugin image into `<namespace>/<image>`
pub fn expand_plugin_image(namespace: &str, image: &str) -> String {
    if image.contains('/') || namespace.is_empty() {
        return image.to_string();
    }
    format!("{}/{}", namespace, image.replace('_', "-"))
}

/// Append `:latest` to untagged images
pub fn tag_image(image: &str) -> String {
    if has_image_tag(image) {
        image.to_string()
    } else {
        format!("{}:latest", image)
    }
}

impl Transform for NormalizeTransform {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        let c = &mut node.container;
        if c.image.is_empty() {
            return Ok(());
        }

        if c.name.is_empty() {
            let image = trim_image_tag(&c.image);
            c.name = image.rsplit('/').next().unwrap_or(image).to_string();
        }
        if c.alias.is_empty() {
            c.alias = c.name.clone();
        }

        if node.kind.is_plugin_like() {
            c.image = expand_plugin_image(&self.namespace, &c.image);
        }
        c.image = tag_image(&c.image);
        Ok(())
    }

    fn visit_volume(&self, node: &mut VolumeNode) -> Result<(), TransformError> {
        if node.volume.driver.is_empty() {
            node.volume.driver = DEFAULT_VOLUME_DRIVER.to_string();
        }
        Ok(())
    }

    fn visit_network(&self, node: &mut NetworkNode) -> Result<(), TransformError> {
        if node.network.driver.is_empty() {
            node.network.driver = DEFAULT_NETWORK_DRIVER.to_string();
        }
        Ok(())
    }
}
