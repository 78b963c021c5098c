// ABOUTME: Health verification for a freshly deployed environment.
// ABOUTME: Liveness short-circuit, then HTTP probing under a bounded retry policy.

mod liveness;
mod probe;
mod retry;
mod verifier;

pub use liveness::{LivenessError, LivenessProbe, SshLiveness, liveness_command};
pub use probe::{EndpointProbe, HttpProbe, ProbeError};
pub use retry::{Clock, RetryOutcome, RetryPolicy, TokioClock};
pub use verifier::{EXPECTED_STATE, HealthVerifier};
