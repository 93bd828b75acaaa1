//! Run context - facts about the current build that step conditions match against

use crate::core::status::BuildStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Context for a single pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContext {
    /// Branch being built
    #[serde(default)]
    pub branch: String,

    /// Triggering event (push, pull_request, tag, deployment)
    #[serde(default)]
    pub event: String,

    /// Platform of the agent, e.g. `linux/amd64`
    #[serde(default)]
    pub platform: String,

    /// Deployment target for deployment events
    #[serde(default)]
    pub environment: String,

    /// Matrix axis values for this job
    #[serde(default)]
    pub matrix: BTreeMap<String, String>,

    /// Status of the previous build, used by `changed` conditions
    #[serde(default)]
    pub previous: Option<BuildStatus>,

    /// Whether the repository may use privileged capabilities
    #[serde(default)]
    pub trusted: bool,
}

impl RunContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_matrix_axis(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.matrix.insert(key.into(), value.into());
        self
    }

    pub fn with_previous(mut self, status: BuildStatus) -> Self {
        self.previous = Some(status);
        self
    }

    pub fn trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = RunContext::new()
            .with_branch("master")
            .with_event("push")
            .with_matrix_axis("GO", "1.22")
            .with_previous(BuildStatus::Failure)
            .trusted(true);

        assert_eq!(ctx.branch, "master");
        assert_eq!(ctx.event, "push");
        assert_eq!(ctx.matrix.get("GO").map(String::as_str), Some("1.22"));
        assert_eq!(ctx.previous, Some(BuildStatus::Failure));
        assert!(ctx.trusted);
        assert!(ctx.platform.is_empty());
    }
}
