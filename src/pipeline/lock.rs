// ABOUTME: Run lock preventing two promotion runs of the same job at once.
// ABOUTME: Atomic create-new lock file with holder info under ~/.local/state/stagehand/.
// ABOUTME: Liveness comes from the holder's pid on this host, or its heartbeat elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{AbortSignal, PromotionError};

/// Base directory for stagehand state files, relative to `$HOME`.
const STATE_DIR: &str = ".local/state/stagehand";

/// How often a running holder rewrites its heartbeat.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Minutes without a heartbeat after which a holder on another host is gone.
const HEARTBEAT_EXPIRY_MINUTES: i64 = 5;

/// Information about who holds a run lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub job: String,
    pub build: String,
    #[serde(default)]
    pub heartbeat_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(job: &str, build: &str) -> Self {
        let now = Utc::now();
        Self {
            holder: local_host(),
            pid: std::process::id(),
            started_at: now,
            job: job.to_string(),
            build: build.to_string(),
            heartbeat_at: now,
        }
    }

    /// Whether the holder is gone.
    ///
    /// A holder on this host is alive exactly while its pid is, however long
    /// the run takes. Elsewhere the heartbeat must be recent.
    pub fn is_stale(&self) -> bool {
        if self.holder == local_host()
            && let Some(alive) = process_alive(self.pid)
        {
            return !alive;
        }
        Utc::now() - self.heartbeat_at > chrono::Duration::minutes(HEARTBEAT_EXPIRY_MINUTES)
    }

    /// Same run, ignoring the heartbeat.
    fn same_holder(&self, other: &LockInfo) -> bool {
        self.holder == other.holder
            && self.pid == other.pid
            && self.started_at == other.started_at
            && self.build == other.build
    }
}

fn local_host() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> Option<bool> {
    Some(Path::new("/proc").join(pid.to_string()).exists())
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> Option<bool> {
    None
}

/// A held run lock. The file is removed on release or drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    info: LockInfo,
    released: AtomicBool,
}

impl RunLock {
    /// `~/.local/state/stagehand`, if `$HOME` is set.
    pub fn default_dir() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(STATE_DIR))
    }

    /// Lock file for `job` inside `dir`.
    pub fn lock_path(dir: &Path, job: &str) -> PathBuf {
        let name: String = job
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        dir.join(format!("{}.lock", name))
    }

    /// Acquire the lock for `job`.
    ///
    /// Fails with `LockHeld` while another live run holds it. Stale locks,
    /// unreadable locks, and any lock when `force` is set are broken with a
    /// warning.
    pub fn acquire(dir: &Path, job: &str, build: &str, force: bool) -> Result<Self, PromotionError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            PromotionError::Lock(format!("failed to create state directory: {}", e))
        })?;

        let path = Self::lock_path(dir, job);
        let info = LockInfo::new(job, build);
        let json = serde_json::to_string(&info)
            .map_err(|e| PromotionError::Lock(format!("failed to serialize lock: {}", e)))?;

        if Self::try_create(&path, &json)? {
            return Ok(Self {
                path,
                info,
                released: AtomicBool::new(false),
            });
        }

        if let Some(existing) = Self::check_existing(&path, force) {
            return Err(PromotionError::LockHeld {
                holder: existing.holder,
                pid: existing.pid,
                started_at: existing.started_at,
            });
        }

        tracing::debug!("removing stale/forced lock at {}", path.display());
        let _ = std::fs::remove_file(&path);

        if !Self::try_create(&path, &json)? {
            return Err(PromotionError::Lock(
                "lock acquired by another process during break".to_string(),
            ));
        }

        Ok(Self {
            path,
            info,
            released: AtomicBool::new(false),
        })
    }

    /// Atomically create the lock file. `Ok(false)` if it already exists.
    fn try_create(path: &Path, json: &str) -> Result<bool, PromotionError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(PromotionError::Lock(format!("failed to create lock: {}", e)));
            }
        };
        file.write_all(json.as_bytes())
            .map_err(|e| PromotionError::Lock(format!("failed to write lock: {}", e)))?;
        Ok(true)
    }

    /// Returns the holder when the existing lock must be respected, `None` when it should be broken.
    fn check_existing(path: &Path, force: bool) -> Option<LockInfo> {
        let Ok(content) = std::fs::read_to_string(path) else {
            tracing::warn!("lock info unreadable, breaking lock");
            return None;
        };

        match serde_json::from_str::<LockInfo>(&content) {
            Ok(existing) if force => {
                tracing::warn!(
                    "breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) if existing.is_stale() => {
                tracing::warn!(
                    "auto-breaking stale lock held by {} (pid {}, last heartbeat {})",
                    existing.holder,
                    existing.pid,
                    existing.heartbeat_at
                );
                None
            }
            Ok(existing) => Some(existing),
            Err(_) => {
                tracing::warn!("lock info corrupted, breaking lock");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock.
    pub fn release(&self) {
        self.remove();
    }

    /// Whether the file on disk still describes this lock (it may have been force-broken).
    pub fn still_ours(&self) -> bool {
        self.read_on_disk()
            .is_some_and(|on_disk| on_disk.same_holder(&self.info))
    }

    /// Rewrite the heartbeat. Returns `false` once another run has taken the lock.
    pub fn refresh(&self) -> bool {
        if self.released.load(Ordering::SeqCst) || !self.still_ours() {
            return false;
        }

        let mut info = self.info.clone();
        info.heartbeat_at = Utc::now();
        let tmp = self.path.with_extension("lock.tmp");
        let written = serde_json::to_string(&info)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&tmp, json))
            .and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            tracing::warn!("failed to refresh lock {}: {}", self.path.display(), e);
        }
        true
    }

    /// Refresh the heartbeat until the lock is released. If another run
    /// takes the lock over, raise `abort` so this run stops.
    pub fn keep_alive(self: &Arc<Self>, abort: AbortSignal) -> JoinHandle<()> {
        let lock = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if lock.released.load(Ordering::SeqCst) {
                    return;
                }
                if !lock.refresh() {
                    tracing::error!(
                        "run lock {} was taken over by another run; stopping",
                        lock.path.display()
                    );
                    abort.abort();
                    return;
                }
            }
        })
    }

    fn read_on_disk(&self) -> Option<LockInfo> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<LockInfo>(&content).ok())
    }

    fn remove(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.still_ours() {
            tracing::debug!("lock {} was taken over; leaving it", self.path.display());
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        self.remove();
    }
}
