//! Program execution

pub mod engine;
pub mod error;
pub mod pipe;
pub mod runner;
pub mod tracer;

pub use engine::{Engine, EngineError, Handle, LogStream, State};
pub use error::ExecError;
pub use pipe::{Line, LineKind, Pipe};
pub use runner::{RunHandle, Runner};
pub use tracer::{Trace, Tracer};
