//! CLI command definitions

use crate::core::{BuildStatus, RunContext};
use clap::Args;

/// Facts about the build the filters match against
#[derive(Debug, Args, Clone, Default)]
pub struct RunContextArgs {
    /// Branch being built
    #[arg(long)]
    pub branch: Option<String>,

    /// Triggering event (push, pull_request, tag, deployment)
    #[arg(long)]
    pub event: Option<String>,

    /// Deployment target environment
    #[arg(long)]
    pub environment: Option<String>,

    /// Agent platform, e.g. linux/amd64
    #[arg(long)]
    pub platform: Option<String>,

    /// Matrix axis (KEY=VALUE), repeatable
    #[arg(long, value_parser = parse_key_value)]
    pub matrix: Vec<(String, String)>,

    /// Status of the previous build, for `changed` conditions
    #[arg(long)]
    pub previous: Option<BuildStatus>,

    /// Allow privileged settings
    #[arg(long)]
    pub trusted: bool,
}

impl RunContextArgs {
    pub fn to_context(&self) -> RunContext {
        let mut context = RunContext::new().trusted(self.trusted);
        if let Some(branch) = &self.branch {
            context = context.with_branch(branch);
        }
        if let Some(event) = &self.event {
            context = context.with_event(event);
        }
        if let Some(environment) = &self.environment {
            context = context.with_environment(environment);
        }
        if let Some(platform) = &self.platform {
            context = context.with_platform(platform);
        }
        for (key, value) in &self.matrix {
            context = context.with_matrix_axis(key, value);
        }
        if let Some(previous) = self.previous {
            context = context.with_previous(previous);
        }
        context
    }
}

/// Compile a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct CompileCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Write the program here instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub context: RunContextArgs,
}

/// Validate a pipeline definition or compiled program
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to a pipeline YAML file or a `.json` program
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show the compiled tree
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    #[command(flatten)]
    pub context: RunContextArgs,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert_eq!(parse_key_value("a=").unwrap(), ("a".to_string(), String::new()));
        assert!(parse_key_value("=b").is_err());
        assert!(parse_key_value("ab").is_err());
    }

    #[test]
    fn test_to_context() {
        let args = RunContextArgs {
            branch: Some("main".into()),
            event: Some("push".into()),
            matrix: vec![("GO".into(), "1.22".into())],
            previous: Some(BuildStatus::Failure),
            trusted: true,
            ..Default::default()
        };
        let context = args.to_context();
        assert_eq!(context.branch, "main");
        assert_eq!(context.event, "push");
        assert_eq!(context.matrix["GO"], "1.22");
        assert_eq!(context.previous, Some(BuildStatus::Failure));
        assert!(context.trusted);
    }
}
