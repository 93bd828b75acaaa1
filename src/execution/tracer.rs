//! Hook consulted before each step starts

use super::ExecError;
use crate::core::Container;
use async_trait::async_trait;

/// Decision returned by a [`Tracer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trace {
    /// Start the container as usual
    Run,
    /// Mark the step successful without starting anything
    Skip,
}

/// Called before every step except the ambassador, e.g. for dry runs or cache hits
#[async_trait]
pub trait Tracer: Send + Sync {
    async fn trace(&self, container: &Container) -> Result<Trace, ExecError>;
}
