//! Execution tree - the program the runner interprets
//!
//! A tree is built from six node kinds. On the wire every node is a JSON
//! object with a `type` discriminator:
//!
//! ```json
//! {"type": "error", "body": {"type": "run", "name": "test"},
//!  "defer": {"type": "list", "body": [{"type": "run", "name": "notify"}]}}
//! ```
//!
//! An unknown `type` is a decode error. Missing `body`/`defer` payloads decode
//! as absent so [`Node::validate`] can report them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural problems found by [`Node::validate`] or `Spec::validate`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} node has an empty body")]
    EmptyBody(&'static str),

    #[error("{0} node is missing its body")]
    MissingBody(&'static str),

    #[error("{0} node is missing its defer branch")]
    MissingDefer(&'static str),

    #[error("run node has an invalid name")]
    InvalidName,

    #[error("run node references unknown container {0}")]
    UnresolvedName(String),

    #[error("invalid container: {0}")]
    InvalidContainer(String),

    #[error("program must be a list node, found {0}")]
    NotAList(&'static str),
}

/// A node of the execution tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    /// Children run in order; the first error stops the rest
    List(ListNode),
    /// Body then defer, always both
    Defer(DeferNode),
    /// Body, then defer only if body failed
    Error(ErrorNode),
    /// Body with its error discarded
    Recover(RecoverNode),
    /// Children run concurrently
    Parallel(ParallelNode),
    /// Start a container
    Run(RunNode),
}

impl Node {
    /// Wire name of the node kind
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::List(_) => ListNode::TYPE,
            Node::Defer(_) => DeferNode::TYPE,
            Node::Error(_) => ErrorNode::TYPE,
            Node::Recover(_) => RecoverNode::TYPE,
            Node::Parallel(_) => ParallelNode::TYPE,
            Node::Run(_) => RunNode::TYPE,
        }
    }

    /// Check structural invariants of this node and everything below it
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Node::List(n) => n.validate(),
            Node::Defer(n) => n.validate(),
            Node::Error(n) => n.validate(),
            Node::Recover(n) => n.validate(),
            Node::Parallel(n) => n.validate(),
            Node::Run(n) => n.validate(),
        }
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::List(n) => n.body.iter().collect(),
            Node::Defer(n) => [opt(&n.body), opt(&n.defer)].concat(),
            Node::Error(n) => [opt(&n.body), opt(&n.defer)].concat(),
            Node::Recover(n) => opt(&n.body),
            Node::Parallel(n) => n.body.iter().collect(),
            Node::Run(_) => Vec::new(),
        }
    }

    /// Every run node in the tree, depth first
    pub fn runs(&self) -> Vec<&RunNode> {
        let mut out = Vec::new();
        collect_runs(self, &mut out);
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn opt(node: &Option<Box<Node>>) -> Vec<&Node> {
    node.as_deref().into_iter().collect()
}

fn collect_runs<'a>(node: &'a Node, out: &mut Vec<&'a RunNode>) {
    if let Node::Run(run) = node {
        out.push(run);
    }
    for child in node.children() {
        collect_runs(child, out);
    }
}

fn validate_required(
    kind: &'static str,
    node: &Option<Box<Node>>,
    missing: fn(&'static str) -> ValidationError,
) -> Result<(), ValidationError> {
    match node {
        Some(node) => node.validate(),
        None => Err(missing(kind)),
    }
}

/// Sequential composition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNode {
    #[serde(default)]
    pub body: Vec<Node>,
}

impl ListNode {
    pub const TYPE: &'static str = "list";

    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, builder style
    pub fn append(mut self, node: impl Into<Node>) -> Self {
        self.body.push(node.into());
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.body.push(node.into());
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.body.is_empty() {
            return Err(ValidationError::EmptyBody(Self::TYPE));
        }
        self.body.iter().try_for_each(Node::validate)
    }
}

/// Runs `defer` unconditionally after `body`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer: Option<Box<Node>>,
}

impl DeferNode {
    pub const TYPE: &'static str = "defer";

    pub fn new(body: impl Into<Node>, defer: impl Into<Node>) -> Self {
        Self {
            body: Some(Box::new(body.into())),
            defer: Some(Box::new(defer.into())),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required(Self::TYPE, &self.body, ValidationError::MissingBody)?;
        validate_required(Self::TYPE, &self.defer, ValidationError::MissingDefer)
    }
}

/// Runs `defer` only when `body` fails
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer: Option<Box<Node>>,
}

impl ErrorNode {
    pub const TYPE: &'static str = "error";

    pub fn new(body: impl Into<Node>, defer: impl Into<Node>) -> Self {
        Self {
            body: Some(Box::new(body.into())),
            defer: Some(Box::new(defer.into())),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required(Self::TYPE, &self.body, ValidationError::MissingBody)?;
        validate_required(Self::TYPE, &self.defer, ValidationError::MissingDefer)
    }
}

/// Swallows any error from `body`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<Node>>,
}

impl RecoverNode {
    pub const TYPE: &'static str = "recover";

    pub fn new(body: impl Into<Node>) -> Self {
        Self {
            body: Some(Box::new(body.into())),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required(Self::TYPE, &self.body, ValidationError::MissingBody)
    }
}

/// Concurrent composition with an optional concurrency cap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelNode {
    #[serde(default)]
    pub body: Vec<Node>,

    /// Maximum children running at once; zero or less means unbounded
    #[serde(default)]
    pub limit: i64,
}

impl ParallelNode {
    pub const TYPE: &'static str = "parallel";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, node: impl Into<Node>) -> Self {
        self.body.push(node.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.body.is_empty() {
            return Err(ValidationError::EmptyBody(Self::TYPE));
        }
        self.body.iter().try_for_each(Node::validate)
    }
}

/// Starts the named container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunNode {
    #[serde(default)]
    pub name: String,

    /// Return as soon as the container has started
    #[serde(default, skip_serializing_if = "is_false")]
    pub detach: bool,

    /// Do not stream the container's logs
    #[serde(default, skip_serializing_if = "is_false")]
    pub silent: bool,
}

impl RunNode {
    pub const TYPE: &'static str = "run";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_detach(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::InvalidName);
        }
        Ok(())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

macro_rules! impl_into_node {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Node {
            fn from(node: $ty) -> Self {
                Node::$variant(node)
            }
        })*
    };
}

impl_into_node!(
    ListNode => List,
    DeferNode => Defer,
    ErrorNode => Error,
    RecoverNode => Recover,
    ParallelNode => Parallel,
    RunNode => Run,
);
