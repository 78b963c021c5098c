// ABOUTME: Slack-compatible incoming-webhook notifier.
// ABOUTME: Posts from spawned tasks so the run never waits on the chat service.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{Notification, NotificationKind, Notifier};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    channel: Option<String>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL is a credential.
        f.debug_struct("WebhookNotifier")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, channel: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            url: url.into(),
            channel,
            in_flight: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn notify(&self, notification: Notification) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime; dropping notification: {}", notification.message);
            return;
        };

        let body = slack_payload(&notification, self.channel.as_deref());
        let request = self.client.post(&self.url).json(&body);

        let handle = runtime.spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(severity = %notification.severity, "notification delivered");
                }
                Ok(resp) => {
                    tracing::warn!(
                        "notification rejected by webhook: HTTP {}",
                        resp.status().as_u16()
                    );
                }
                Err(e) => {
                    tracing::warn!("notification delivery failed: {}", e);
                }
            }
        });

        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    async fn flush(&self, timeout: Duration) {
        let handles: Vec<_> = self.in_flight.lock().drain(..).collect();
        if handles.is_empty() {
            return;
        }

        let pending = handles.len();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(timeout, wait_all).await.is_err() {
            tracing::warn!(
                "gave up waiting for {} notification(s) after {:?}",
                pending,
                timeout
            );
        }
    }
}

/// Build the webhook body: a single attachment coloured by severity.
pub fn slack_payload(notification: &Notification, channel: Option<&str>) -> Value {
    let mut fields = vec![
        json!({ "title": "Job", "value": notification.job, "short": true }),
        json!({ "title": "Build", "value": notification.build, "short": true }),
    ];

    if let Some(env) = notification.environment {
        fields.push(json!({ "title": "Environment", "value": env.as_str(), "short": true }));
    }

    if let Some(summary) = &notification.summary {
        fields.push(json!({
            "title": "Status",
            "value": summary.status.to_string(),
            "short": true,
        }));
        fields.push(json!({
            "title": "Duration",
            "value": format!("{:.1}s", summary.duration_secs),
            "short": true,
        }));
        for link in &summary.links {
            fields.push(json!({
                "title": link.environment.as_str(),
                "value": link.url,
                "short": false,
            }));
        }
    }

    let title = match notification.kind {
        NotificationKind::Final => format!("{} #{}", notification.job, notification.build),
        NotificationKind::Stage => String::new(),
    };

    let mut payload = json!({
        "username": "stagehand",
        "attachments": [{
            "color": notification.severity.to_string(),
            "title": title,
            "text": notification.message,
            "fields": fields,
        }],
    });

    if let Some(channel) = channel {
        payload["channel"] = Value::String(channel.to_string());
    }

    payload
}
