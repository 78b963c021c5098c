// ABOUTME: Status notifications emitted during and at the end of a run.
// ABOUTME: Message contract, the Notifier trait, and log and webhook sinks.

mod message;
mod webhook;

pub use message::{EnvironmentLink, Notification, NotificationKind, NotifyContext, RunSummary, Severity};
pub use webhook::{WebhookNotifier, slack_payload};

use async_trait::async_trait;
use std::time::Duration;

/// One-way sink for run status.
///
/// `notify` must not block the caller and never reports delivery failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    /// Wait up to `timeout` for deliveries still in flight.
    async fn flush(&self, _timeout: Duration) {}
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Good => tracing::info!(
                job = %notification.job,
                build = %notification.build,
                kind = ?notification.kind,
                "{}",
                notification.message
            ),
            Severity::Warning | Severity::Danger => tracing::warn!(
                job = %notification.job,
                build = %notification.build,
                kind = ?notification.kind,
                severity = %notification.severity,
                "{}",
                notification.message
            ),
        }
    }
}
