// ABOUTME: Promotion gate: one bounded wait for a human (or automated) decision.
// ABOUTME: Sources supply an answer; the gate applies the timeout and allow-list.

mod file;
mod terminal;

pub use file::FileApprover;
pub use terminal::{TerminalApprover, parse_answer};

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::{ApprovalDecision, Decision};

/// Context shown to whoever decides.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub job: String,
    pub build: String,
    /// Where the verified staging release can be inspected.
    pub staging_link: String,
}

/// An answer from an approval source, before the allow-list is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalResponse {
    pub approved: bool,
    pub responder: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("approval input closed before a decision was made")]
    InputClosed,

    #[error("cannot read decision file {path}: {reason}")]
    DecisionFile { path: String, reason: String },
}

/// Something that can be asked to approve or reject a promotion.
///
/// Implementations may wait indefinitely; the gate bounds the wait.
#[async_trait]
pub trait ApprovalSource: Send + Sync {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalResponse, SourceError>;
}

/// Approves immediately. For pipelines with no human in the loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprover;

pub const AUTO_RESPONDER: &str = "auto";

#[async_trait]
impl ApprovalSource for AutoApprover {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalResponse, SourceError> {
        Ok(ApprovalResponse {
            approved: true,
            responder: Some(AUTO_RESPONDER.to_string()),
        })
    }
}

/// Single-use gate between a verified staging release and production.
pub struct PromotionGate {
    source: Arc<dyn ApprovalSource>,
    timeout: Duration,
    approvers: Vec<String>,
}

impl PromotionGate {
    pub fn new(source: Arc<dyn ApprovalSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            approvers: Vec::new(),
        }
    }

    /// Restrict who may approve. An empty list allows anyone.
    pub fn with_approvers(mut self, approvers: Vec<String>) -> Self {
        self.approvers = approvers;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait at most the configured timeout for a decision.
    ///
    /// Consumes the gate: a run gets exactly one decision. A source failure
    /// counts as a rejection.
    pub async fn request_approval(self, request: &ApprovalRequest) -> ApprovalDecision {
        let requested_at = Utc::now();
        tracing::info!(job = %request.job, build = %request.build, timeout = ?self.timeout, "waiting for promotion approval");

        let response = match tokio::time::timeout(self.timeout, self.source.decide(request)).await
        {
            Err(_) => {
                tracing::warn!("no approval decision within {:?}", self.timeout);
                return ApprovalDecision {
                    requested_at,
                    responder: None,
                    decision: Decision::TimedOut,
                };
            }
            Ok(Err(e)) => {
                tracing::warn!("approval source failed: {}", e);
                return ApprovalDecision {
                    requested_at,
                    responder: None,
                    decision: Decision::Rejected,
                };
            }
            Ok(Ok(response)) => response,
        };

        let decision = if response.approved && self.is_allowed(response.responder.as_deref()) {
            Decision::Approved
        } else {
            if response.approved {
                tracing::warn!(
                    responder = response.responder.as_deref().unwrap_or("unknown"),
                    "approval from someone outside the approver list; treating as rejected"
                );
            }
            Decision::Rejected
        };

        ApprovalDecision {
            requested_at,
            responder: response.responder,
            decision,
        }
    }

    fn is_allowed(&self, responder: Option<&str>) -> bool {
        if self.approvers.is_empty() {
            return true;
        }
        responder.is_some_and(|r| self.approvers.iter().any(|a| a == r))
    }
}
