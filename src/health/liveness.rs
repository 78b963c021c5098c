// ABOUTME: Remote liveness check: is the service process up on the target host?
// ABOUTME: Runs a container inspect or systemd query over SSH and reports the state.

use async_trait::async_trait;

use crate::config::{Environment, LivenessKind, SshConfig};
use crate::runtime::{DetectionError, RuntimeType, detect_runtime};
use crate::ssh::Session;

#[derive(Debug, thiserror::Error)]
pub enum LivenessError {
    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("liveness query exited with code {exit_code}: {stderr}")]
    Query { exit_code: u32, stderr: String },
}

/// Reports the service state on an environment's target host.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Current state string, e.g. `running` or `exited`.
    async fn service_state(&self, env: &Environment) -> Result<String, LivenessError>;
}

/// Shell command that prints the service state on the remote host.
pub fn liveness_command(kind: LivenessKind, runtime: Option<RuntimeType>, service: &str) -> String {
    match kind {
        LivenessKind::Container => {
            let cli = runtime.unwrap_or(RuntimeType::Docker).cli();
            format!("{} inspect --format '{{{{.State.Status}}}}' {}", cli, service)
        }
        LivenessKind::Systemd => {
            format!("systemctl show --property=SubState --value {}", service)
        }
    }
}

/// Liveness over a fresh SSH session per check.
#[derive(Debug, Clone)]
pub struct SshLiveness {
    ssh: SshConfig,
}

impl SshLiveness {
    pub fn new(ssh: SshConfig) -> Self {
        Self { ssh }
    }

    async fn query(&self, session: &Session, env: &Environment) -> Result<String, LivenessError> {
        let runtime = match env.liveness {
            LivenessKind::Container => Some(detect_runtime(session, env.runtime).await?),
            LivenessKind::Systemd => None,
        };

        let command = liveness_command(env.liveness, runtime, env.service.as_str());
        tracing::debug!(environment = %env.id, %command, "querying service state");

        let output = session.exec(&command).await?;
        if !output.success() {
            return Err(LivenessError::Query {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl LivenessProbe for SshLiveness {
    async fn service_state(&self, env: &Environment) -> Result<String, LivenessError> {
        let session = Session::connect(self.ssh.session_config(env)).await?;
        let result = self.query(&session, env).await;
        if let Err(e) = session.disconnect().await {
            tracing::debug!("ssh disconnect after liveness check failed: {}", e);
        }
        result
    }
}
