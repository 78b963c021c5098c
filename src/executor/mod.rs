// ABOUTME: Deployment executor: one remote configuration-management run per call.
// ABOUTME: Records the attempt, classifies the exit status and announces the outcome.

mod playbook;

pub use playbook::PlaybookRunner;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::config::Environment;
use crate::notify::{Notifier, NotifyContext, Severity};
use crate::pipeline::{AttemptState, DeploymentAttempt, PromotionError};

/// The remote run could not be started at all.
#[derive(Debug, thiserror::Error)]
#[error("failed to launch {program}: {reason}")]
pub struct LaunchError {
    pub program: String,
    pub reason: String,
}

/// Triggers the remote configuration-management run for an environment.
#[async_trait]
pub trait RemoteRunner: Send + Sync {
    /// Run to completion and return the exit code (`None` if killed by a signal).
    async fn run(&self, environment: &Environment) -> Result<Option<i32>, LaunchError>;
}

/// A failed deploy still yields its attempt record alongside the error.
pub type DeployResult = Result<DeploymentAttempt, (DeploymentAttempt, PromotionError)>;

pub struct DeploymentExecutor {
    runner: Arc<dyn RemoteRunner>,
    notifier: Arc<dyn Notifier>,
    context: NotifyContext,
}

impl DeploymentExecutor {
    pub fn new(
        runner: Arc<dyn RemoteRunner>,
        notifier: Arc<dyn Notifier>,
        context: NotifyContext,
    ) -> Self {
        Self {
            runner,
            notifier,
            context,
        }
    }

    /// Deploy the current build to `environment`. Never retries.
    pub async fn deploy(&self, environment: &Environment) -> DeployResult {
        let started_at = Utc::now();
        tracing::info!(environment = %environment.id, target = %environment.target, "starting deployment");

        let (exit_code, launch_error) = match self.runner.run(environment).await {
            Ok(code) => (code, None),
            Err(e) => (None, Some(e.to_string())),
        };

        let state = if exit_code == Some(0) {
            AttemptState::Succeeded
        } else {
            AttemptState::Failed
        };

        let attempt = DeploymentAttempt {
            environment: environment.id,
            started_at,
            finished_at: Utc::now(),
            exit_code,
            state,
        };

        if attempt.succeeded() {
            tracing::info!(environment = %environment.id, "deployment succeeded");
            self.notifier.notify(self.context.stage(
                Severity::Good,
                Some(environment.id),
                format!(
                    "deployed {} build {} to {}",
                    self.context.job, self.context.build, environment.id
                ),
            ));
            return Ok(attempt);
        }

        let error = PromotionError::DeploymentFailure {
            environment: environment.id,
            exit_code,
            reason: launch_error,
        };
        tracing::error!(environment = %environment.id, "{}", error);
        self.notifier.notify(self.context.stage(
            Severity::Danger,
            Some(environment.id),
            error.to_string(),
        ));
        Err((attempt, error))
    }
}
