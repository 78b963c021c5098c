// ABOUTME: Health verification settings with per-environment overrides.
// ABOUTME: Defaults: 3 attempts, 30s between attempts, 10s per HTTP probe.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerificationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for VerificationConfig {
    fn default() -> Self {
        VerificationConfig {
            max_attempts: default_max_attempts(),
            interval: default_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Per-environment override; unset fields inherit the top-level values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationOverride {
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

impl VerificationConfig {
    pub fn merged(&self, over: Option<&VerificationOverride>) -> VerificationConfig {
        let Some(over) = over else {
            return *self;
        };
        VerificationConfig {
            max_attempts: over.max_attempts.unwrap_or(self.max_attempts),
            interval: over.interval.unwrap_or(self.interval),
            request_timeout: over.request_timeout.unwrap_or(self.request_timeout),
        }
    }
}
