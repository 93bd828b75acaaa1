//! cinder - compiles build pipelines into execution trees and runs them

pub mod cli;
pub mod compiler;
pub mod core;
pub mod execution;
pub mod parse;
pub mod transform;
pub mod tree;

// Re-export commonly used types
pub use compiler::{CompileError, Compiler};
pub use core::{BuildStatus, Config, Container, RunContext, Spec};
pub use execution::{Engine, EngineError, ExecError, Line, Pipe, RunHandle, Runner, Trace, Tracer};
pub use parse::RootNode;
pub use transform::{Chain, Transform, TransformError};
pub use tree::{Node, ValidationError};
