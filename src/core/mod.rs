//! Core domain models
//!
//! This module defines the containers, conditions and compiled programs
//! shared by the compiler and the runner, plus operator configuration.

pub mod conditions;
pub mod config;
pub mod container;
pub mod context;
pub mod spec;
pub mod status;

pub use conditions::{Conditions, Constraint};
pub use config::{Config, ProxyConfig, Secret};
pub use container::{Auth, Container, Network, Volume};
pub use context::RunContext;
pub use spec::Spec;
pub use status::BuildStatus;
