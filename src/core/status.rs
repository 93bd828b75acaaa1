//! Terminal build status

use crate::execution::ExecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exit codes that mean the process was killed rather than failing on its own
const KILLED_EXIT_CODES: [i32; 3] = [128, 130, 137];

/// Overall status of a finished build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Every blocking step exited zero
    Success,
    /// A step failed or the backend errored
    Failure,
    /// The build was cancelled or a step was killed
    Killed,
}

impl BuildStatus {
    /// Map the result of a run to its terminal status
    pub fn from_result(result: &Result<(), ExecError>) -> Self {
        match result {
            Ok(()) => BuildStatus::Success,
            Err(ExecError::Exit { code, .. }) if KILLED_EXIT_CODES.contains(code) => {
                BuildStatus::Killed
            }
            Err(e) if e.is_cancelled() => BuildStatus::Killed,
            Err(_) => BuildStatus::Failure,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Success => "success",
            BuildStatus::Failure => "failure",
            BuildStatus::Killed => "killed",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(BuildStatus::Success),
            "failure" | "error" => Ok(BuildStatus::Failure),
            "killed" => Ok(BuildStatus::Killed),
            other => Err(format!("unknown build status: {}", other)),
        }
    }
}
