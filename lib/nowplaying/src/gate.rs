use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default number of existence checks before giving up.
const DEFAULT_RETRY_LIMIT: u32 = 60;

/// Default delay between existence checks (1 second).
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Waits for a file to appear, one check per `poll_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitGate {
    pub retry_limit: u32,
    pub poll_interval: Duration,
}

impl WaitGate {
    pub fn new(retry_limit: u32, poll_interval: Duration) -> Self {
        Self {
            retry_limit,
            poll_interval,
        }
    }

    /// Returns true once `path` exists, false after `retry_limit` failed
    /// checks or as soon as `cancel` fires.
    ///
    /// Every failed check is followed by a cancellable delay, so the gate never
    /// spins and a cancellation lands within one poll.
    pub async fn wait(&self, path: &Path, cancel: &CancellationToken) -> bool {
        for attempt in 0..=self.retry_limit {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return true;
            }
            if attempt == self.retry_limit {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Wait for {:?} cancelled", path);
                    return false;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        debug!(
            "{:?} did not appear after {} checks",
            path,
            self.retry_limit + 1
        );
        false
    }
}

impl Default for WaitGate {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_LIMIT, DEFAULT_POLL_INTERVAL)
    }
}
