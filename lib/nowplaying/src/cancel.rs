use shared::Dataset;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::accumulator::Accumulator;
use crate::error::StoreError;
use crate::store::{AppendStore, FlushReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Running,
    Flushed,
}

/// Turns external interrupts into cooperative cancellation and guarantees
/// that the session's events are flushed exactly once, whichever way the
/// session ends.
pub struct CancellationHandler {
    token: CancellationToken,
    flushed: AtomicBool,
    interrupts: AtomicUsize,
    store: AppendStore,
    path: PathBuf,
}

impl CancellationHandler {
    pub fn new(store: AppendStore, path: impl Into<PathBuf>) -> Self {
        Self {
            token: CancellationToken::new(),
            flushed: AtomicBool::new(false),
            interrupts: AtomicUsize::new(0),
            store,
            path: path.into(),
        }
    }

    /// Token observed by the polling loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> HandlerState {
        if self.flushed.load(Ordering::Acquire) {
            HandlerState::Flushed
        } else {
            HandlerState::Running
        }
    }

    /// Records an external interrupt. Only the first one cancels the session;
    /// later ones are ignored while the flush runs.
    pub fn interrupt(&self) {
        let previous = self.interrupts.fetch_add(1, Ordering::AcqRel);
        if previous == 0 && !self.token.is_cancelled() {
            info!("Interrupt received. Saving events and exiting gracefully.");
            self.token.cancel();
        } else {
            warn!("Interrupt ignored, already shutting down");
        }
    }

    /// Flushes the accumulator into the store, once.
    ///
    /// Returns `None` when a flush already happened; the store is not touched
    /// again in that case.
    pub async fn flush(
        &self,
        accumulator: &mut Accumulator,
    ) -> Option<Result<FlushReport, StoreError>> {
        if self.flushed.swap(true, Ordering::AcqRel) {
            warn!("Events already saved to {:?}, skipping flush", self.path);
            return None;
        }
        self.token.cancel();

        let records = accumulator.drain();
        info!("Saving {} new events to {:?}", records.len(), self.path);
        Some(self.store.flush(Dataset::snapshot(records), &self.path).await)
    }
}
