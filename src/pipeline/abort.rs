// ABOUTME: Operator abort flag checked between promotion stages.
// ABOUTME: Waits that can last long (the approval gate) also end as soon as it is raised.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct AbortSignal(Arc<watch::Sender<bool>>);

impl Default for AbortSignal {
    fn default() -> Self {
        Self(Arc::new(watch::channel(false).0))
    }
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the signal has been raised.
    pub async fn aborted(&self) {
        let mut rx = self.0.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}
