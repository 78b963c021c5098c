// ABOUTME: Error taxonomy for promotion runs.
// ABOUTME: Deployment, verification, approval, abort and run-lock failures.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::model::Stage;
use crate::types::EnvironmentId;

/// Why a promotion run stopped short of success.
#[derive(Debug, thiserror::Error)]
pub enum PromotionError {
    /// The remote configuration-management run did not exit cleanly.
    #[error("deployment to {environment} failed: {}", describe_exit(*.exit_code, .reason.as_deref()))]
    DeploymentFailure {
        environment: EnvironmentId,
        exit_code: Option<i32>,
        reason: Option<String>,
    },

    /// The environment never became healthy within its retry budget.
    #[error("{environment} is unhealthy: {}", describe_health(*.service_running, *.attempts, *.last_status))]
    VerificationFailure {
        environment: EnvironmentId,
        service_running: bool,
        attempts: u32,
        last_status: Option<u16>,
    },

    #[error("promotion rejected{}", .responder.as_deref().map(|r| format!(" by {r}")).unwrap_or_default())]
    ApprovalRejected { responder: Option<String> },

    #[error("no promotion decision within {}s", .timeout.as_secs())]
    ApprovalTimeout { timeout: Duration },

    #[error("run aborted before {stage}")]
    Aborted { stage: Stage },

    /// Another run broke this run's lock with `--force`.
    #[error("run lock was taken over by another run; stopped before {stage}")]
    Superseded { stage: Stage },

    #[error("another run holds the lock for this job ({holder}, pid {pid}, since {started_at})")]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("run lock error: {0}")]
    Lock(String),
}

fn describe_exit(exit_code: Option<i32>, reason: Option<&str>) -> String {
    match (exit_code, reason) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => "terminated without exit status".to_string(),
    }
}

fn describe_health(service_running: bool, attempts: u32, last_status: Option<u16>) -> String {
    if !service_running {
        return "service is not running".to_string();
    }
    match last_status {
        Some(status) => format!("last HTTP status {status} after {attempts} attempt(s)"),
        None => format!("no HTTP response after {attempts} attempt(s)"),
    }
}
