// ABOUTME: Identifier for the two rollout environments.
// ABOUTME: Staging always precedes production in a promotion run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown environment '{0}' (expected 'staging' or 'production')")]
pub struct UnknownEnvironment(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentId {
    Staging,
    Production,
}

impl EnvironmentId {
    pub const ALL: [EnvironmentId; 2] = [EnvironmentId::Staging, EnvironmentId::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentId::Staging => "staging",
            EnvironmentId::Production => "production",
        }
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentId {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" | "stage" => Ok(EnvironmentId::Staging),
            "production" | "prod" => Ok(EnvironmentId::Production),
            other => Err(UnknownEnvironment(other.to_string())),
        }
    }
}
