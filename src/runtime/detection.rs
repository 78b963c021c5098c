// ABOUTME: Runtime detection logic for remote systems.
// ABOUTME: Checks for Podman sockets first, then Docker, then CLI presence.

use super::types::RuntimeType;
use crate::ssh::Session;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets and CLIs)")]
    NoRuntimeFound,

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime on the remote server.
///
/// Detection order (when not explicitly configured):
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
/// 4. Whichever of `docker` / `podman` is on the remote `PATH`
pub async fn detect_runtime(
    session: &Session,
    explicit: Option<RuntimeType>,
) -> Result<RuntimeType, DetectionError> {
    if let Some(runtime) = explicit {
        return Ok(runtime);
    }

    let uid_output = session.exec("id -u").await?;
    if uid_output.success() {
        let uid = uid_output.stdout.trim();
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if session.file_exists(&rootless_socket).await? {
            return Ok(RuntimeType::Podman);
        }
    }

    if session.file_exists(ROOTFUL_PODMAN).await? {
        return Ok(RuntimeType::Podman);
    }

    if session.file_exists(DOCKER_SOCKET).await? {
        return Ok(RuntimeType::Docker);
    }

    for runtime in [RuntimeType::Docker, RuntimeType::Podman] {
        let probe = session
            .exec(&format!("command -v {} >/dev/null", runtime.cli()))
            .await?;
        if probe.success() {
            tracing::debug!(%runtime, "found runtime CLI on PATH");
            return Ok(runtime);
        }
    }

    Err(DetectionError::NoRuntimeFound)
}
