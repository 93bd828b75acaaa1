//! Compiled program: the contract between compiler and runner

use crate::core::container::{Container, Network, Volume};
use crate::tree::{ListNode, Node, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A compiled pipeline, ready to be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    /// Containers referenced by run nodes; names are unique
    #[serde(default)]
    pub containers: Vec<Container>,

    #[serde(default)]
    pub volumes: Vec<Volume>,

    #[serde(default)]
    pub networks: Vec<Network>,

    /// Root of the execution tree; always a list node
    pub program: Node,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            volumes: Vec::new(),
            networks: Vec::new(),
            program: ListNode::new().into(),
        }
    }
}

impl Spec {
    /// Find a container by name; the first match wins
    pub fn lookup(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Check the tree invariants and that every run node resolves
    ///
    /// An empty root list is a program with nothing to run and is accepted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.program {
            Node::List(list) if list.body.is_empty() => {}
            Node::List(_) => self.program.validate()?,
            other => return Err(ValidationError::NotAList(other.type_name())),
        }

        let mut seen = HashSet::new();
        for container in &self.containers {
            container.validate().map_err(ValidationError::InvalidContainer)?;
            if !seen.insert(container.name.as_str()) {
                return Err(ValidationError::InvalidContainer(format!(
                    "duplicate container name {}",
                    container.name
                )));
            }
        }

        for run in self.program.runs() {
            if self.lookup(&run.name).is_none() {
                return Err(ValidationError::UnresolvedName(run.name.clone()));
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
