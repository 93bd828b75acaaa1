//! Inline commands to an encoded shell script

use super::{Transform, TransformError};
use crate::parse::{ContainerNode, NodeKind, Workspace};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Environment variable carrying the encoded script
pub const SCRIPT_ENV: &str = "CI_CMDS";

const SHELL: &str = "/bin/sh";

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellTransform;

/// Build the script: fail fast, enter the workspace, trace and run each command
pub fn script(workspace_path: &str, commands: &[String]) -> String {
    let mut out = String::from("#!/bin/sh\nset -e\n\n");
    if !workspace_path.is_empty() {
        out.push_str(&format!("mkdir -p {0}\ncd {0}\n\n", workspace_path));
    }
    for command in commands {
        let escaped = format!("{:?}", format!("+ {}", command));
        out.push_str(&format!("echo {}\n{}\n\n", escaped, command));
    }
    out
}

impl Transform for ShellTransform {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn visit_container(&self, node: &mut ContainerNode, workspace: &Workspace) -> Result<(), TransformError> {
        if node.kind != NodeKind::Shell || node.commands.is_empty() {
            return Ok(());
        }
        let encoded = STANDARD.encode(script(&workspace.path, &node.commands));

        let c = &mut node.container;
        c.entrypoint = vec![SHELL.to_string(), "-c".to_string()];
        c.command = vec![format!("echo ${} | base64 -d | {} -e", SCRIPT_ENV, SHELL)];
        c.environment.insert(SCRIPT_ENV.to_string(), encoded);
        c.environment.entry("HOME".to_string()).or_insert_with(|| "/root".to_string());
        c.environment.insert("SHELL".to_string(), SHELL.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Container;

    #[test]
    fn test_script_layout() {
        let s = script("/drone/src", &["go build".into(), "go test".into()]);
        assert!(s.starts_with("#!/bin/sh\nset -e\n"));
        assert!(s.contains("cd /drone/src\n"));
        assert!(s.contains("echo \"+ go build\"\ngo build\n"));
        assert!(s.find("go build").unwrap() < s.find("go test").unwrap());
    }

    #[test]
    fn test_shell_step_encoded() {
        let mut node = ContainerNode::new(NodeKind::Shell, Container::new("test", "golang:latest"));
        node.commands = vec!["go test".into()];
        let ws = Workspace { base: "/drone".into(), path: "/drone/src".into() };
        ShellTransform.visit_container(&mut node, &ws).unwrap();

        let c = &node.container;
        assert_eq!(c.entrypoint, vec!["/bin/sh", "-c"]);
        assert_eq!(c.command, vec!["echo $CI_CMDS | base64 -d | /bin/sh -e"]);
        assert_eq!(c.environment["HOME"], "/root");
        let decoded = STANDARD.decode(&c.environment[SCRIPT_ENV]).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), script("/drone/src", &node.commands));
    }

    #[test]
    fn test_plugins_untouched() {
        let mut node = ContainerNode::new(NodeKind::Plugin, Container::new("p", "plugins/slack"));
        ShellTransform.visit_container(&mut node, &Workspace::default()).unwrap();
        assert!(node.container.entrypoint.is_empty());
        assert!(node.container.environment.is_empty());
    }
}
