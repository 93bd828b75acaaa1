//! Condition filters - disable steps that should not run for this build

use super::{Transform, TransformError};
use crate::core::{BuildStatus, Constraint, RunContext};
use crate::parse::{ContainerNode, NodeKind, RootNode, Workspace};
use tracing::debug;

const CHANGE_STATUSES: [&str; 3] = ["change", "changed", "changes"];

#[derive(Debug, Clone)]
pub struct FilterTransform {
    context: RunContext,
}

impl FilterTransform {
    pub fn new(context: RunContext) -> Self {
        Self { context }
    }

    /// Name of the first condition that rejects the node, if any
    fn rejected_by(&self, node: &ContainerNode, platform: &str) -> Option<&'static str> {
        let when = &node.conditions;
        let checks: [(&'static str, &Constraint, &str); 4] = [
            ("branch", &when.branch, &self.context.branch),
            ("event", &when.event, &self.context.event),
            ("platform", &when.platform, platform),
            ("environment", &when.environment, &self.context.environment),
        ];
        for (name, constraint, value) in checks {
            if !constraint.is_empty() && !constraint.matches(value) {
                return Some(name);
            }
        }
        if !when.matches_matrix(&self.context.matrix) {
            return Some("matrix");
        }
        None
    }

    /// Default the status condition and expand `changed` against the previous build
    fn rewrite_status(&self, status: &mut Constraint) {
        if status.include.is_empty() {
            status.include.push(BuildStatus::Success.to_string());
            return;
        }
        if !status.include.iter().any(|s| CHANGE_STATUSES.contains(&s.as_str())) {
            return;
        }
        status.include.retain(|s| !CHANGE_STATUSES.contains(&s.as_str()));
        let want: &[BuildStatus] = match self.context.previous {
            Some(BuildStatus::Success) => &[BuildStatus::Failure],
            Some(BuildStatus::Failure) | Some(BuildStatus::Killed) => &[BuildStatus::Success],
            None => &[BuildStatus::Success, BuildStatus::Failure],
        };
        for status_name in want.iter().map(BuildStatus::to_string) {
            if !status.include.contains(&status_name) {
                status.include.push(status_name);
            }
        }
    }
}

impl Transform for FilterTransform {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn visit_root(&self, root: &mut RootNode) -> Result<(), TransformError> {
        // the agent platform wins over the one declared in the pipeline
        if !self.context.platform.is_empty() {
            root.platform = self.context.platform.clone();
        }
        Ok(())
    }

    fn visit_container(&self, node: &mut ContainerNode, _ws: &Workspace) -> Result<(), TransformError> {
        if !matches!(node.kind, NodeKind::Plugin | NodeKind::Shell) {
            return Ok(());
        }
        self.rewrite_status(&mut node.conditions.status);
        if node.disabled {
            return Ok(());
        }

        let platform = if self.context.platform.is_empty() {
            crate::transform::workspace::DEFAULT_PLATFORM
        } else {
            self.context.platform.as_str()
        };
        if let Some(condition) = self.rejected_by(node, platform) {
            debug!(
                "Disabling step {}: {} condition does not match",
                node.container.name, condition
            );
            node.disabled = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtered(yaml: &str, context: RunContext) -> RootNode {
        let mut root = RootNode::load(yaml).unwrap();
        root.walk(&FilterTransform::new(context)).unwrap();
        root
    }

    const PIPELINE: &str = r#"
script:
  test:
    image: golang
    commands: [go test]
  deploy:
    image: golang
    commands: [make deploy]
    when:
      branch: [master, "release/*"]
      event: push
  arm:
    image: golang
    commands: [make]
    when:
      platform: linux/arm*
  go18:
    image: golang
    commands: [make]
    when:
      matrix:
        GO_VERSION: "1.8"
"#;

    fn enabled(root: &RootNode) -> Vec<&str> {
        root.script
            .iter()
            .filter(|s| !s.disabled)
            .map(|s| s.container.name.as_str())
            .collect()
    }

    #[test]
    fn test_branch_and_event() {
        let ctx = RunContext::new().with_branch("master").with_event("push");
        let root = filtered(PIPELINE, ctx);
        assert_eq!(enabled(&root), vec!["test", "deploy"]);

        let ctx = RunContext::new().with_branch("release/2.0").with_event("push");
        assert!(enabled(&filtered(PIPELINE, ctx)).contains(&"deploy"));

        let ctx = RunContext::new().with_branch("feature").with_event("push");
        assert_eq!(enabled(&filtered(PIPELINE, ctx)), vec!["test"]);
    }

    #[test]
    fn test_platform_and_matrix() {
        let ctx = RunContext::new()
            .with_platform("linux/arm64")
            .with_matrix_axis("GO_VERSION", "1.8");
        let root = filtered(PIPELINE, ctx);
        assert_eq!(enabled(&root), vec!["test", "arm", "go18"]);
        assert_eq!(root.platform, "linux/arm64");
    }

    #[test]
    fn test_status_defaults_to_success() {
        let root = filtered(PIPELINE, RunContext::new());
        assert_eq!(root.script[0].conditions.status.include, vec!["success"]);
    }

    #[test]
    fn test_changed_status() {
        let yaml = "script:\n  notify:\n    image: slack\n    when:\n      status: changed\n";

        let root = filtered(yaml, RunContext::new().with_previous(BuildStatus::Success));
        assert_eq!(root.script[0].conditions.status.include, vec!["failure"]);

        let root = filtered(yaml, RunContext::new().with_previous(BuildStatus::Failure));
        assert_eq!(root.script[0].conditions.status.include, vec!["success"]);

        let root = filtered(yaml, RunContext::new());
        assert_eq!(root.script[0].conditions.status.include, vec!["success", "failure"]);
    }

    #[test]
    fn test_services_untouched() {
        let yaml = "services:\n  db:\n    image: postgres\n    when: {branch: master}\n";
        let root = filtered(yaml, RunContext::new().with_branch("develop"));
        assert!(!root.services[0].disabled);
    }
}
