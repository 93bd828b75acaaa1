//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{CompileCommand, PlanCommand, ValidateCommand};
use std::ffi::OsString;

/// Build pipeline compiler
#[derive(Debug, Parser, Clone)]
#[command(name = "cinder")]
#[command(version = "0.1.0")]
#[command(about = "Compiles build pipelines into execution programs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the operator configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Compile a pipeline definition to its JSON program
    Compile(CompileCommand),

    /// Check a pipeline definition or a compiled program
    Validate(ValidateCommand),

    /// Print the compiled execution tree as an outline
    Plan(PlanCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
