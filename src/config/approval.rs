// ABOUTME: Promotion gate settings.
// ABOUTME: Approval timeout (default 10 minutes) and optional approver allow-list.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Responders allowed to approve. Empty means anyone.
    #[serde(default)]
    pub approvers: Vec<String>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        ApprovalConfig {
            timeout: default_timeout(),
            approvers: Vec::new(),
        }
    }
}
