//! Container engine abstraction
//!
//! The runner only needs these five calls. A Docker backend, a remote agent
//! or a test double all implement [`Engine`].

use crate::core::Container;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Opaque reference to a started container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle(pub String);

impl Handle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exit state of a finished container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct State {
    pub exit_code: i32,
    pub oom_killed: bool,
}

impl State {
    pub fn exited(exit_code: i32) -> Self {
        Self {
            exit_code,
            oom_killed: false,
        }
    }
}

/// Combined stdout/stderr of a container
pub type LogStream = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The container was stopped because the run was cancelled
    #[error("cancelled")]
    Cancelled,

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("engine error: {0}")]
    Backend(String),
}

/// Trait for container backends
#[async_trait]
pub trait Engine: Send + Sync {
    /// Create and start a container
    async fn container_start(&self, container: &Container) -> Result<Handle, EngineError>;

    /// Stop a running container; stopping twice is not an error
    async fn container_stop(&self, handle: &Handle) -> Result<(), EngineError>;

    async fn container_remove(&self, handle: &Handle) -> Result<(), EngineError>;

    /// Block until the container exits
    async fn container_wait(&self, handle: &Handle) -> Result<State, EngineError>;

    async fn container_logs(&self, handle: &Handle) -> Result<LogStream, EngineError>;
}
