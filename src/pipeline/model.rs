// ABOUTME: Records produced by a promotion run.
// ABOUTME: Deployment attempts, health results, the approval decision and the run aggregate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::types::EnvironmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptState {
    Succeeded,
    Failed,
}

/// One remote configuration-management run against an environment.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentAttempt {
    pub environment: EnvironmentId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Exit status of the remote run; `None` when it never started or was killed by a signal.
    pub exit_code: Option<i32>,
    pub state: AttemptState,
}

impl DeploymentAttempt {
    pub fn succeeded(&self) -> bool {
        self.state == AttemptState::Succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

/// Outcome of verifying an environment after deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub environment: EnvironmentId,
    pub service_running: bool,
    /// Status of the last HTTP response; `None` if no response was ever received.
    pub http_status: Option<u16>,
    /// HTTP probe attempts made.
    pub attempts: u32,
    pub verdict: Verdict,
}

impl HealthCheckResult {
    pub fn is_healthy(&self) -> bool {
        self.verdict == Verdict::Healthy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Approved,
    Rejected,
    TimedOut,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
            Decision::TimedOut => "timed-out",
        })
    }
}

/// The single promotion decision recorded for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalDecision {
    pub requested_at: DateTime<Utc>,
    pub responder: Option<String>,
    pub decision: Decision,
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        self.decision == Decision::Approved
    }
}

/// Deployment attempt and its verification for one environment.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub attempt: DeploymentAttempt,
    pub health: Option<HealthCheckResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        })
    }
}

/// Points at which a run can stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    StagingDeploy,
    StagingVerify,
    Approval,
    ProductionDeploy,
    ProductionVerify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::StagingDeploy => "staging deploy",
            Stage::StagingVerify => "staging verification",
            Stage::Approval => "promotion approval",
            Stage::ProductionDeploy => "production deploy",
            Stage::ProductionVerify => "production verification",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Halt {
    pub stage: Stage,
    pub reason: String,
}

/// Everything recorded during one promotion run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub job: String,
    pub build: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageRecord>,
    pub approval: Option<ApprovalDecision>,
    pub status: Option<RunStatus>,
    pub halted: Option<Halt>,
}

impl PipelineRun {
    pub fn new(job: impl Into<String>, build: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            build: build.into(),
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            approval: None,
            status: None,
            halted: None,
        }
    }

    pub(crate) fn record_attempt(&mut self, attempt: DeploymentAttempt) {
        self.stages.push(StageRecord {
            attempt,
            health: None,
        });
    }

    pub(crate) fn record_health(&mut self, result: HealthCheckResult) {
        if let Some(stage) = self
            .stages
            .iter_mut()
            .rev()
            .find(|s| s.attempt.environment == result.environment)
        {
            stage.health = Some(result);
        }
    }

    pub(crate) fn finish(&mut self, status: RunStatus, halted: Option<Halt>) {
        self.finished_at = Some(Utc::now());
        self.status = Some(status);
        self.halted = halted;
    }

    pub fn attempts(&self) -> impl Iterator<Item = &DeploymentAttempt> {
        self.stages.iter().map(|s| &s.attempt)
    }

    pub fn health_results(&self) -> impl Iterator<Item = &HealthCheckResult> {
        self.stages.iter().filter_map(|s| s.health.as_ref())
    }

    pub fn attempts_for(&self, environment: EnvironmentId) -> usize {
        self.attempts()
            .filter(|a| a.environment == environment)
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(RunStatus::Success)
    }

    /// Wall-clock duration, up to now if the run is still in progress.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}
