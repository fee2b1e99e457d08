//! Command line and environment configuration.
//!
//! Every setting can come from a flag or an environment variable and is
//! resolved once at startup.

use clap::Parser;
use nowplaying::producer::DEFAULT_COMMAND;
use nowplaying::{CommandProducer, ProducerError, SessionConfig, WaitGate};
use std::path::PathBuf;
use std::time::Duration;

/// Logs the songs playing around you into a deduplicated table.
#[derive(Debug, Clone, Parser)]
#[command(name = "nowplaying")]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Event log file. The extension picks the format; unknown ones fall back
    /// to CSV next to it.
    #[arg(env = "NOWPLAYING_DB", default_value = "shazam.csv")]
    pub db_file: PathBuf,

    /// Where the producer writes each snapshot.
    #[arg(env = "NOWPLAYING_SNAPSHOT", default_value = "./www")]
    pub snapshot_file: PathBuf,

    /// Producer command. `{output}` is replaced by the snapshot path.
    #[arg(long, env = "NOWPLAYING_PRODUCER", default_value = DEFAULT_COMMAND)]
    pub producer: String,

    /// Existence checks before a snapshot counts as missing.
    #[arg(long, env = "NOWPLAYING_RETRY_LIMIT", default_value_t = 60)]
    pub retry_limit: u32,

    /// Delay between existence checks, in milliseconds.
    #[arg(long, env = "NOWPLAYING_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Pause after a new song or an empty poll, in milliseconds.
    #[arg(long, env = "NOWPLAYING_NOVEL_DELAY_MS", default_value_t = 5000)]
    pub novel_delay_ms: u64,

    /// Pause after hearing the same song again, in milliseconds.
    #[arg(long, env = "NOWPLAYING_REPEAT_COOLDOWN_MS", default_value_t = 20000)]
    pub repeat_cooldown_ms: u64,

    /// Upper bound on one producer run, in seconds.
    #[arg(long, env = "NOWPLAYING_PRODUCER_TIMEOUT_SECS", default_value_t = 120)]
    pub producer_timeout_secs: u64,

    /// Stop after this many polls instead of running until interrupted.
    #[arg(long, env = "NOWPLAYING_MAX_POLLS")]
    pub max_polls: Option<u64>,
}

impl AppConfig {
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            snapshot_path: self.snapshot_file.clone(),
            gate: WaitGate::new(
                self.retry_limit,
                Duration::from_millis(self.poll_interval_ms),
            ),
            novel_delay: Duration::from_millis(self.novel_delay_ms),
            repeat_cooldown: Duration::from_millis(self.repeat_cooldown_ms),
            max_polls: self.max_polls,
        }
    }

    pub fn producer(&self) -> Result<CommandProducer, ProducerError> {
        Ok(CommandProducer::from_template(&self.producer)?
            .with_timeout(Duration::from_secs(self.producer_timeout_secs)))
    }
}
