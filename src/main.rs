use anyhow::{Context, Result};
use cinder::cli::commands::{CompileCommand, PlanCommand, ValidateCommand};
use cinder::cli::output::*;
use cinder::cli::{Cli, Command};
use cinder::core::{Config, ProxyConfig};
use cinder::{Chain, Compiler, Spec};
use std::path::Path;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG overrides the flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to set logging subscriber")?;

    let mut config = Config::discover(cli.config.as_deref().map(Path::new))
        .context("Failed to load configuration")?;
    config.proxy = config.proxy.or(ProxyConfig::from_env());
    debug!("Using namespace {}", config.namespace);

    match &cli.command {
        Command::Compile(cmd) => compile_pipeline(cmd, &config),
        Command::Validate(cmd) => validate_pipeline(cmd, &config),
        Command::Plan(cmd) => plan_pipeline(cmd, &config),
    }
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}

fn compile_pipeline(cmd: &CompileCommand, config: &Config) -> Result<()> {
    let yaml = read_file(&cmd.file)?;
    let compiler = Compiler::new(Chain::standard(config, &cmd.context.to_context()));
    let spec = compiler.compile(&yaml).context("Failed to compile pipeline")?;

    let json = if cmd.pretty {
        spec.to_json_pretty()?
    } else {
        spec.to_json()?
    };
    match &cmd.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path))?;
            eprintln!("{} Program written to {}", CHECK, style(path).bold());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand, config: &Config) -> Result<()> {
    println!("{} Validating {}...", INFO, style(&cmd.file).bold());
    let content = read_file(&cmd.file)?;

    let result = if cmd.file.ends_with(".json") {
        Spec::from_json(&content)
            .map_err(anyhow::Error::from)
            .and_then(|spec| spec.validate().map(|_| spec).map_err(anyhow::Error::from))
    } else {
        let compiler = Compiler::new(Chain::standard(config, &Default::default()));
        compiler.compile(&content).map_err(anyhow::Error::from)
    };

    match result {
        Ok(spec) => {
            println!("{} Pipeline is valid!", CHECK);
            println!("  Containers: {}", style(spec.containers.len()).cyan());
            println!("  Steps: {}", style(spec.program.runs().len()).cyan());
            if !spec.volumes.is_empty() {
                println!("  Volumes: {}", style(spec.volumes.len()).cyan());
            }
            if !spec.networks.is_empty() {
                println!("  Networks: {}", style(spec.networks.len()).cyan());
            }
            if cmd.json {
                println!("\n{}", spec.to_json_pretty()?);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(&e).red());
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn plan_pipeline(cmd: &PlanCommand, config: &Config) -> Result<()> {
    let yaml = read_file(&cmd.file)?;
    let compiler = Compiler::new(Chain::standard(config, &cmd.context.to_context()));
    let spec = compiler.compile(&yaml).context("Failed to compile pipeline")?;

    if spec.containers.iter().any(|c| c.privileged) {
        println!("{} Pipeline runs privileged containers", WARN);
    }
    print!("{}", format_tree(&spec));
    Ok(())
}
