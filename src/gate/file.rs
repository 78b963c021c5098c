// ABOUTME: Approval via a decision file written by an external system.
// ABOUTME: First line is approve or reject; an optional second line names the responder.
// ABOUTME: A file left over from an earlier run is discarded when the gate opens.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::{ApprovalRequest, ApprovalResponse, ApprovalSource, SourceError, parse_answer};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct FileApprover {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileApprover {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn parse(content: &str) -> Option<ApprovalResponse> {
        let mut lines = content.lines();
        let approved = parse_answer(lines.next()?)?;
        let responder = lines
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(ApprovalResponse {
            approved,
            responder,
        })
    }
}

#[async_trait]
impl ApprovalSource for FileApprover {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalResponse, SourceError> {
        self.discard_previous(request).await?;

        tracing::info!(path = %self.path.display(), "polling for approval decision");
        loop {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => {
                    if let Some(response) = Self::parse(&content) {
                        return Ok(response);
                    }
                    tracing::debug!("decision file present but not yet readable as a decision");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(SourceError::DecisionFile {
                        path: self.path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl FileApprover {
    /// Only a decision written after the gate opened may count for this build.
    async fn discard_previous(&self, request: &ApprovalRequest) -> Result<(), SourceError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::warn!(
                    path = %self.path.display(),
                    build = %request.build,
                    "discarded decision file left over from an earlier run"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SourceError::DecisionFile {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::PromotionGate;
    use crate::pipeline::Decision;
    use std::sync::Arc;

    fn request() -> ApprovalRequest {
        ApprovalRequest {
            job: "shop-api".to_string(),
            build: "117".to_string(),
            staging_link: "http://staging.internal/health".to_string(),
        }
    }

    #[test]
    fn parses_decision_and_responder() {
        let response = FileApprover::parse("approve\nalice\n").unwrap();
        assert!(response.approved);
        assert_eq!(response.responder.as_deref(), Some("alice"));

        let response = FileApprover::parse("reject").unwrap();
        assert!(!response.approved);
        assert!(response.responder.is_none());

        assert!(FileApprover::parse("").is_none());
        assert!(FileApprover::parse("pending\n").is_none());
    }

    #[tokio::test]
    async fn picks_up_file_written_after_polling_starts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decision");
        let approver = FileApprover::new(&path).poll_interval(Duration::from_millis(20));

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                tokio::fs::write(&path, "approve\nbob\n").await.unwrap();
            })
        };

        let response = approver.decide(&request()).await.unwrap();
        writer.await.unwrap();
        assert!(response.approved);
        assert_eq!(response.responder.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn leftover_decision_does_not_approve_a_new_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decision");
        std::fs::write(&path, "approve\nalice\n").unwrap();

        let approver = FileApprover::new(&path).poll_interval(Duration::from_millis(20));
        let gate = PromotionGate::new(Arc::new(approver), Duration::from_millis(200));
        let decision = gate.request_approval(&request()).await;

        assert_eq!(decision.decision, Decision::TimedOut);
        assert!(decision.responder.is_none());
        assert!(!path.exists());
    }
}
