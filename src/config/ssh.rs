// ABOUTME: SSH settings used by the liveness probe.
// ABOUTME: Key selection, host key policy and remote command timeout.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::Environment;
use crate::ssh::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    #[serde(default)]
    pub key: Option<PathBuf>,

    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    /// Accept and remember unknown host keys (off unless set).
    #[serde(default)]
    pub trust_first_connection: bool,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for SshConfig {
    fn default() -> Self {
        SshConfig {
            key: None,
            known_hosts: None,
            trust_first_connection: false,
            command_timeout: default_command_timeout(),
        }
    }
}

impl SshConfig {
    pub fn session_config(&self, env: &Environment) -> SessionConfig {
        SessionConfig::for_address(&env.target)
            .bastion(env.bastion.clone())
            .key_path(self.key.clone())
            .known_hosts_path(self.known_hosts.clone())
            .trust_on_first_use(self.trust_first_connection)
            .command_timeout(self.command_timeout)
    }
}
