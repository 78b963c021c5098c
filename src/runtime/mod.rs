// ABOUTME: Container runtime selection for liveness checks on remote hosts.
// ABOUTME: Uses the configured runtime or detects Docker/Podman over SSH.

mod detection;
mod types;

pub use detection::{DetectionError, detect_runtime};
pub use types::RuntimeType;
