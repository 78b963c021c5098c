// ABOUTME: Configuration types and parsing for stagehand.yml.
// ABOUTME: Handles YAML parsing, validation and per-environment resolution.

mod approval;
mod deploy;
mod env_value;
mod environment;
mod init;
mod notify;
mod ssh;
mod verification;

pub use approval::ApprovalConfig;
pub use deploy::DeployConfig;
pub use env_value::EnvValue;
pub use environment::{Environment, EnvironmentConfig, LivenessKind};
pub use init::init_config;
pub use notify::NotifyConfig;
pub use ssh::SshConfig;
pub use verification::{VerificationConfig, VerificationOverride};

use crate::error::{Error, Result};
use crate::types::EnvironmentId;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "stagehand.yml";
pub const CONFIG_FILENAME_ALT: &str = "stagehand.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".stagehand/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Job identifier reported in notifications; CLI and `$JOB_NAME` may override.
    #[serde(default)]
    pub job: Option<String>,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub verification: VerificationConfig,

    #[serde(default)]
    pub approval: ApprovalConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub ssh: SshConfig,

    pub environments: Environments,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Environments {
    pub staging: EnvironmentConfig,
    pub production: EnvironmentConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Build the immutable `Environment` record for `id`.
    pub fn environment(&self, id: EnvironmentId) -> Environment {
        let raw = match id {
            EnvironmentId::Staging => &self.environments.staging,
            EnvironmentId::Production => &self.environments.production,
        };
        Environment::resolve(id, raw, &self.deploy.playbook, &self.verification)
    }

    fn validate(&self) -> Result<()> {
        if self.deploy.program.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "deploy.program cannot be empty".to_string(),
            ));
        }

        for id in EnvironmentId::ALL {
            let env = self.environment(id);
            if env.verification.max_attempts == 0 {
                return Err(Error::InvalidConfig(format!(
                    "{id}: verification.max_attempts must be at least 1"
                )));
            }
            if env.verification.request_timeout.is_zero() {
                return Err(Error::InvalidConfig(format!(
                    "{id}: verification.request_timeout must be greater than zero"
                )));
            }
            if env.inventory.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "{id}: inventory cannot be empty"
                )));
            }
            if env.playbook.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "{id}: playbook cannot be empty"
                )));
            }
        }

        if self.approval.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "approval.timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
