//! Launching the external snapshot producer.
//!
//! The default producer is the macOS Shortcuts `shazam_step` shortcut, which
//! listens for the current song and writes its snapshot to `--output-path`.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ProducerError, Result};
use crate::traits::SnapshotProducer;

/// Placeholder replaced by the snapshot path in a command template.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

pub const DEFAULT_COMMAND: &str = "shortcuts run shazam_step --output-path {output}";

/// Default upper bound on a single producer run (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Runs an external command that writes the snapshot file.
///
/// At most one run is alive at a time: starting a capture kills a previous
/// run that is still going, so two runs never write the same snapshot.
#[derive(Debug)]
pub struct CommandProducer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    running: Mutex<Option<JoinHandle<()>>>,
}

impl CommandProducer {
    /// Builds a producer from a whitespace separated command template.
    ///
    /// Every `{output}` occurrence is replaced by the snapshot path. A
    /// template without the placeholder gets the path as its last argument.
    pub fn from_template(template: &str) -> Result<Self, ProducerError> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ProducerError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            running: Mutex::new(None),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_for(&self, target: &Path) -> Command {
        let target = target.to_string_lossy();
        let mut cmd = Command::new(&self.program);
        let mut substituted = false;
        for arg in &self.args {
            if arg.contains(OUTPUT_PLACEHOLDER) {
                substituted = true;
                cmd.arg(arg.replace(OUTPUT_PLACEHOLDER, &target));
            } else {
                cmd.arg(arg);
            }
        }
        if !substituted {
            cmd.arg(target.as_ref());
        }
        cmd
    }
}

impl Default for CommandProducer {
    fn default() -> Self {
        Self {
            program: "shortcuts".to_string(),
            args: ["run", "shazam_step", "--output-path", OUTPUT_PLACEHOLDER]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SnapshotProducer for CommandProducer {
    fn id(&self) -> &'static str {
        "command"
    }

    async fn capture(&self, target: &Path) -> Result<()> {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            if !previous.is_finished() {
                warn!("Previous `{}` run still going, stopping it", self.program);
                // Dropping the child inside the aborted task kills it.
                previous.abort();
                let _ = previous.await;
            }
        }

        let mut cmd = self.command_for(target);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ProducerError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        info!("Identifying current song with `{}`", self.program);

        let program = self.program.clone();
        let timeout = self.timeout;
        // Exit status is informational only; the snapshot file is the result.
        *running = Some(tokio::spawn(async move {
            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(Ok(output)) if output.status.success() => {
                    debug!("Producer `{}` finished", program);
                }
                Ok(Ok(output)) => {
                    warn!(
                        "Producer `{}` exited with {:?}: {}",
                        program,
                        output.status.code(),
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
                Ok(Err(e)) => warn!("Failed waiting for producer `{}`: {}", program, e),
                Err(_) => warn!(
                    "Producer `{}` timed out after {}s and was killed",
                    program,
                    timeout.as_secs()
                ),
            }
        }));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn default_runs_the_shortcut() {
        let cmd = CommandProducer::default().command_for(Path::new("/tmp/www"));
        assert_eq!(cmd.as_std().get_program(), "shortcuts");
        assert_eq!(
            args_of(&cmd),
            ["run", "shazam_step", "--output-path", "/tmp/www"]
        );
    }

    #[test]
    fn template_without_placeholder_appends_path() {
        let producer = CommandProducer::from_template("my-tool --quiet").unwrap();
        let cmd = producer.command_for(Path::new("out.xml"));
        assert_eq!(args_of(&cmd), ["--quiet", "out.xml"]);
    }

    #[test]
    fn placeholder_inside_argument() {
        let producer = CommandProducer::from_template("tool --out={output}").unwrap();
        let cmd = producer.command_for(Path::new("a.xml"));
        assert_eq!(args_of(&cmd), ["--out=a.xml"]);
    }

    #[test]
    fn empty_template_is_rejected() {
        assert!(matches!(
            CommandProducer::from_template("   "),
            Err(ProducerError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let producer =
            CommandProducer::from_template("definitely-not-a-real-producer-binary").unwrap();
        let err = producer.capture(Path::new("x.xml")).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Producer(ProducerError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_runs_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("snapshot.xml");
        let producer = CommandProducer::from_template("touch {output}").unwrap();

        producer.capture(&target).await.unwrap();

        for _ in 0..100 {
            if target.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("producer never wrote {:?}", target);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn new_capture_stops_previous_run() {
        // Never exits on its own.
        let producer = CommandProducer::from_template("tail -f {output}").unwrap();

        producer.capture(Path::new("/dev/null")).await.unwrap();
        let first = producer
            .running
            .lock()
            .await
            .as_ref()
            .map(|run| run.abort_handle())
            .unwrap();
        assert!(!first.is_finished());

        producer.capture(Path::new("/dev/null")).await.unwrap();
        assert!(first.is_finished());
    }
}
