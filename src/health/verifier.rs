// ABOUTME: Decides whether a deployed environment is healthy.
// ABOUTME: One liveness check, then HTTP probes until a 200 or the retry budget is spent.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{Clock, HttpProbe, LivenessProbe, ProbeError, RetryPolicy};
use crate::config::Environment;
use crate::pipeline::{HealthCheckResult, Verdict};

/// Service state that counts as up.
pub const EXPECTED_STATE: &str = "running";

pub struct HealthVerifier {
    liveness: Arc<dyn LivenessProbe>,
    http: Arc<dyn HttpProbe>,
    clock: Arc<dyn Clock>,
}

impl HealthVerifier {
    pub fn new(
        liveness: Arc<dyn LivenessProbe>,
        http: Arc<dyn HttpProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            liveness,
            http,
            clock,
        }
    }

    /// Verify `env` using its configured retry settings.
    pub async fn verify(&self, env: &Environment) -> HealthCheckResult {
        self.verify_with(env, RetryPolicy::from(&env.verification))
            .await
    }

    /// Verify `env` with an explicit retry policy.
    ///
    /// A service that is not running fails immediately with no HTTP probes.
    /// Only status 200 is success; other codes and transport errors are
    /// retried alike.
    pub async fn verify_with(&self, env: &Environment, policy: RetryPolicy) -> HealthCheckResult {
        let running = match self.liveness.service_state(env).await {
            Ok(state) if state == EXPECTED_STATE => true,
            Ok(state) => {
                tracing::warn!(environment = %env.id, service = %env.service.as_str(), %state, "service is not running");
                false
            }
            Err(e) => {
                tracing::warn!(environment = %env.id, "liveness check failed: {}", e);
                false
            }
        };

        if !running {
            return HealthCheckResult {
                environment: env.id,
                service_running: false,
                http_status: None,
                attempts: 0,
                verdict: Verdict::Unhealthy,
            };
        }

        let http = &self.http;
        let url = &env.health_url;
        let timeout = env.verification.request_timeout;
        let id = env.id;
        // Last status actually received, even if later attempts never connected.
        let last_status = Mutex::new(None);
        let last_status = &last_status;

        let outcome = policy
            .run(
                self.clock.as_ref(),
                move |attempt| async move {
                    let result = http.get(url, timeout).await;
                    match &result {
                        Ok(status) => {
                            *last_status.lock() = Some(*status);
                            tracing::debug!(environment = %id, attempt, status, "health probe answered");
                        }
                        Err(e) => {
                            tracing::debug!(environment = %id, attempt, "health probe failed: {}", e);
                        }
                    }
                    result
                },
                |result: &Result<u16, ProbeError>| matches!(result, Ok(200)),
            )
            .await;

        let verdict = if outcome.succeeded {
            Verdict::Healthy
        } else {
            Verdict::Unhealthy
        };

        HealthCheckResult {
            environment: env.id,
            service_running: true,
            http_status: *last_status.lock(),
            attempts: outcome.attempts,
            verdict,
        }
    }
}
