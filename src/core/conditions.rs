//! Step conditions (`when:` blocks) and glob constraint matching

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Match a value against a shell-style glob, falling back to equality for
/// patterns that are not valid globs
pub fn glob_match(pattern: &str, value: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(value),
        Err(_) => pattern == value,
    }
}

/// A set of include/exclude glob patterns
///
/// In YAML a constraint may be a single string, a list of strings, or a map
/// with `include` and `exclude` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Constraint {
    pub fn new<I, S>(include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// An empty include list matches everything not excluded
    pub fn matches(&self, value: &str) -> bool {
        if self.exclude.iter().any(|p| glob_match(p, value)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| glob_match(p, value))
    }

    /// Matches only when the value is explicitly included
    pub fn includes(&self, value: &str) -> bool {
        !self.include.is_empty() && self.matches(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawConstraint {
    One(String),
    Many(Vec<String>),
    Split {
        #[serde(default)]
        include: OneOrMany,
        #[serde(default)]
        exclude: OneOrMany,
    },
}

#[derive(Deserialize, Default)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
    #[default]
    #[serde(skip)]
    Empty,
}

impl From<OneOrMany> for Vec<String> {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
            OneOrMany::Empty => Vec::new(),
        }
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawConstraint::deserialize(deserializer)? {
            RawConstraint::One(s) => Constraint::new([s]),
            RawConstraint::Many(v) => Constraint::new(v),
            RawConstraint::Split { include, exclude } => Constraint {
                include: include.into(),
                exclude: exclude.into(),
            },
        })
    }
}

/// Conditions gating whether a step runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default)]
    pub platform: Constraint,
    #[serde(default)]
    pub environment: Constraint,
    #[serde(default)]
    pub event: Constraint,
    #[serde(default)]
    pub branch: Constraint,
    #[serde(default)]
    pub status: Constraint,
    #[serde(default)]
    pub matrix: BTreeMap<String, String>,
}

impl Conditions {
    /// Every matrix key in the condition must equal the axis value of the run
    pub fn matches_matrix(&self, axis: &BTreeMap<String, String>) -> bool {
        if self.matrix.is_empty() {
            return true;
        }
        self.matrix
            .iter()
            .all(|(k, v)| axis.get(k).is_some_and(|got| got == v))
    }

    /// Whether the step belongs on the success path
    pub fn runs_on_success(&self) -> bool {
        self.status.matches("success")
    }

    /// Whether the step is a failure handler
    pub fn runs_on_failure(&self) -> bool {
        self.status.includes("failure")
    }
}
