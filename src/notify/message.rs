// ABOUTME: Notification payload types.
// ABOUTME: Severity, stage vs. final kind, and the end-of-run summary.

use serde::Serialize;
use std::fmt;

use crate::config::Environment;
use crate::pipeline::{PipelineRun, RunStatus};
use crate::types::EnvironmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Good,
    Warning,
    Danger,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Good => "good",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Progress within the run (a deploy, a verification, a pending approval).
    Stage,
    /// The single end-of-run status.
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentLink {
    pub environment: EnvironmentId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub duration_secs: f64,
    pub links: Vec<EnvironmentLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub kind: NotificationKind,
    pub message: String,
    pub job: String,
    pub build: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

/// Job and build identity stamped on every notification of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyContext {
    pub job: String,
    pub build: String,
}

impl NotifyContext {
    pub fn new(job: impl Into<String>, build: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            build: build.into(),
        }
    }

    pub fn stage(
        &self,
        severity: Severity,
        environment: Option<EnvironmentId>,
        message: impl Into<String>,
    ) -> Notification {
        Notification {
            severity,
            kind: NotificationKind::Stage,
            message: message.into(),
            job: self.job.clone(),
            build: self.build.clone(),
            environment,
            summary: None,
        }
    }

    /// End-of-run notification for a finished run.
    pub fn final_for(&self, run: &PipelineRun, environments: &[&Environment]) -> Notification {
        let status = run.status.unwrap_or(RunStatus::Failure);
        let (severity, message) = match (&status, &run.halted) {
            (RunStatus::Success, _) => (
                Severity::Good,
                format!("{} build {} promoted to production", self.job, self.build),
            ),
            (RunStatus::Failure, Some(halt)) => (
                Severity::Danger,
                format!(
                    "{} build {} failed at {}: {}",
                    self.job, self.build, halt.stage, halt.reason
                ),
            ),
            (RunStatus::Failure, None) => (
                Severity::Danger,
                format!("{} build {} failed", self.job, self.build),
            ),
        };

        let links = environments
            .iter()
            .map(|env| EnvironmentLink {
                environment: env.id,
                url: env.link.clone(),
            })
            .collect();

        let duration_secs = run.duration().num_milliseconds().max(0) as f64 / 1000.0;

        Notification {
            severity,
            kind: NotificationKind::Final,
            message,
            job: self.job.clone(),
            build: self.build.clone(),
            environment: None,
            summary: Some(RunSummary {
                status,
                duration_secs,
                links,
            }),
        }
    }
}
