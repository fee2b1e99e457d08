//! The polling loop.
//!
//! Each poll asks the producer for a fresh snapshot, waits for the file,
//! parses and deletes it, then decides whether the record is a new event.
//! The previous record is carried explicitly in [`PollState`] from one poll
//! to the next.

use shared::{Field, Record};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::accumulator::Accumulator;
use crate::detector::changed;
use crate::error::ParseError;
use crate::gate::WaitGate;
use crate::parser;
use crate::traits::SnapshotProducer;

/// Default delay after a new event or an empty poll (5 seconds).
const DEFAULT_NOVEL_DELAY: Duration = Duration::from_secs(5);

/// Default cool-down after hearing the same event again (20 seconds).
const DEFAULT_REPEAT_COOLDOWN: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where the producer writes each snapshot.
    pub snapshot_path: PathBuf,
    pub gate: WaitGate,
    /// Pause after a new event, or after a poll that produced nothing.
    pub novel_delay: Duration,
    /// Longer pause after a repeat, so the same song is not re-acquired
    /// over and over.
    pub repeat_cooldown: Duration,
    /// Stop after this many polls. `None` polls until cancelled.
    pub max_polls: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./www"),
            gate: WaitGate::default(),
            novel_delay: DEFAULT_NOVEL_DELAY,
            repeat_cooldown: DEFAULT_REPEAT_COOLDOWN,
            max_polls: None,
        }
    }
}

/// State carried from one poll to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    pub previous: Option<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new event was accumulated.
    Novel,
    /// Same event as the previous poll.
    Repeat,
    /// The snapshot had no usable record.
    NoRecord,
    /// The snapshot did not appear in time.
    NotReady,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Ready,
    NotReady,
    Cancelled,
}

/// Producer invocation plus wait gate, run as its own task so a slow
/// producer never delays observing cancellation.
pub struct SnapshotTask;

impl SnapshotTask {
    pub fn spawn(
        producer: Arc<dyn SnapshotProducer>,
        path: PathBuf,
        gate: WaitGate,
        cancel: CancellationToken,
    ) -> JoinHandle<SnapshotOutcome> {
        tokio::spawn(async move {
            // Only a file written by this capture counts.
            remove_snapshot(&path).await;
            if let Err(e) = producer.capture(&path).await {
                warn!("Producer {} failed: {}", producer.id(), e);
                return SnapshotOutcome::NotReady;
            }
            if gate.wait(&path, &cancel).await {
                SnapshotOutcome::Ready
            } else if cancel.is_cancelled() {
                SnapshotOutcome::Cancelled
            } else {
                SnapshotOutcome::NotReady
            }
        })
    }
}

pub struct Session {
    producer: Arc<dyn SnapshotProducer>,
    config: SessionConfig,
}

impl Session {
    pub fn new(producer: Arc<dyn SnapshotProducer>, config: SessionConfig) -> Self {
        Self { producer, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Polls until `cancel` fires or `max_polls` is reached.
    pub async fn run(&self, accumulator: &mut Accumulator, cancel: &CancellationToken) {
        // A leftover snapshot from an earlier run is not a fresh result.
        remove_snapshot(&self.config.snapshot_path).await;

        let mut state = PollState::default();
        let mut polls = 0u64;
        loop {
            if self.config.max_polls.is_some_and(|max| polls >= max) {
                info!("Reached {} polls, stopping", polls);
                break;
            }
            polls += 1;

            let (next, outcome) = self.poll(state, accumulator, cancel).await;
            state = next;

            let delay = match outcome {
                PollOutcome::Cancelled => break,
                PollOutcome::Repeat => self.config.repeat_cooldown,
                PollOutcome::Novel | PollOutcome::NoRecord | PollOutcome::NotReady => {
                    self.config.novel_delay
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(
            "Polling stopped after {} polls with {} new events",
            polls,
            accumulator.len()
        );
    }

    /// One poll: capture, wait, parse, delete, detect.
    pub async fn poll(
        &self,
        state: PollState,
        accumulator: &mut Accumulator,
        cancel: &CancellationToken,
    ) -> (PollState, PollOutcome) {
        if cancel.is_cancelled() {
            return (state, PollOutcome::Cancelled);
        }

        let path = &self.config.snapshot_path;
        let mut task = SnapshotTask::spawn(
            self.producer.clone(),
            path.clone(),
            self.config.gate,
            cancel.clone(),
        );
        let snapshot = tokio::select! {
            _ = cancel.cancelled() => {
                task.abort();
                SnapshotOutcome::Cancelled
            }
            joined = &mut task => joined.unwrap_or_else(|e| {
                warn!("Snapshot task failed: {}", e);
                SnapshotOutcome::NotReady
            }),
        };

        match snapshot {
            SnapshotOutcome::Cancelled => return (state, PollOutcome::Cancelled),
            SnapshotOutcome::NotReady => {
                debug!("No snapshot at {:?} this poll", path);
                return (state, PollOutcome::NotReady);
            }
            SnapshotOutcome::Ready => {}
        }

        let parsed = parser::parse(path).await;
        remove_snapshot(path).await;

        let record = match parsed {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Snapshot carried no title");
                return (state, PollOutcome::NoRecord);
            }
            Err(ParseError::NotFound(_)) => return (state, PollOutcome::NotReady),
            Err(e) if e.is_recoverable() => {
                warn!("Skipping snapshot: {}", e);
                return (state, PollOutcome::NoRecord);
            }
            Err(e) => {
                error!("Could not read snapshot: {}", e);
                return (state, PollOutcome::NoRecord);
            }
        };

        info!(
            "{}: \"{}\" by {}",
            record.field(Field::Timestamp).unwrap_or("-"),
            record.field(Field::Title).unwrap_or_default(),
            record.field(Field::Artist).unwrap_or("unknown artist")
        );

        if changed(state.previous.as_ref(), &record) {
            accumulator.add(record.clone());
            (
                PollState {
                    previous: Some(record),
                },
                PollOutcome::Novel,
            )
        } else {
            debug!("Same song as last poll, cooling down");
            (
                PollState {
                    previous: Some(record),
                },
                PollOutcome::Repeat,
            )
        }
    }
}

async fn remove_snapshot(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove snapshot {:?}: {}", path, e),
    }
}
