// ABOUTME: Notification sink settings.
// ABOUTME: Chat webhook URL (usually from an env var) and destination channel.

use super::EnvValue;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook: Option<EnvValue>,

    #[serde(default)]
    pub channel: Option<String>,
}

impl NotifyConfig {
    /// Webhook URL, if one is configured and resolvable.
    pub fn webhook_url(&self) -> Option<String> {
        self.webhook.as_ref().and_then(EnvValue::resolve_optional)
    }
}
