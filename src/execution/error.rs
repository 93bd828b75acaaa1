//! Runtime errors

use super::EngineError;
use crate::tree::ValidationError;
use thiserror::Error;

/// Error produced while running a program
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{name} was killed: out of memory")]
    Oom { name: String },

    #[error("{name} exited with code {code}")]
    Exit { name: String, code: i32 },

    #[error("build cancelled")]
    Cancelled,

    #[error("no container named {0}")]
    NotFound(String),

    #[error("tracer failed: {0}")]
    Trace(String),

    #[error("invalid program: {0}")]
    Invalid(#[from] ValidationError),
}

impl ExecError {
    /// Whether the error comes from cancelling the run
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled | ExecError::Engine(EngineError::Cancelled))
    }

    /// Exit code carried by the error, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Exit { code, .. } => Some(*code),
            _ => None,
        }
    }
}
