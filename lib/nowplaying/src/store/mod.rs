//! Merging session events into the persisted dataset.
//!
//! A flush loads the existing dataset (if any), appends the new batch,
//! deduplicates by key keeping the first occurrence, and writes the result
//! back with the codec picked from the file extension. The result is written
//! to a sibling file first and renamed over the original, so a failed write
//! leaves the persisted dataset as it was. Flushes against the same file are
//! serialized.

pub mod codec;
pub mod registry;

use itertools::Itertools;
use shared::Dataset;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{CodecError, StoreError};
use crate::traits::Codec;
pub use registry::{CodecRegistry, CodecRegistryBuilder, Resolved};

/// Outcome of a successful flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Records in the dataset as written.
    pub written: usize,
    /// File actually written, after any fallback substitution.
    pub path: PathBuf,
    pub codec: &'static str,
    pub substituted: bool,
}

#[derive(Clone)]
pub struct AppendStore {
    registry: Arc<CodecRegistry>,
    writers: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl AppendStore {
    pub fn new(registry: CodecRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            writers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    async fn writer_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().await;
        writers.entry(path.to_path_buf()).or_default().clone()
    }

    /// Merges `batch` into the dataset at `path`.
    ///
    /// An empty batch writes nothing. An unsupported extension is replaced by
    /// the registry's fallback (`<base>.csv`) with a warning. A persisted
    /// dataset whose columns differ from the batch's is left untouched and
    /// reported as [`StoreError::SchemaMismatch`].
    pub async fn flush(&self, batch: Dataset, path: &Path) -> Result<FlushReport, StoreError> {
        let resolved = self.registry.resolve(path);
        if resolved.substituted {
            warn!(
                "Unsupported file extension for {:?}. Writing {:?} in default format {}",
                path,
                resolved.path,
                resolved.codec.name()
            );
        }

        let report = FlushReport {
            written: 0,
            path: resolved.path.clone(),
            codec: resolved.codec.name(),
            substituted: resolved.substituted,
        };
        if batch.is_empty() {
            info!("Nothing to write to {:?}", resolved.path);
            return Ok(report);
        }

        let lock = self.writer_lock(&resolved.path).await;
        let _guard = lock.lock().await;

        let Resolved { codec, path, .. } = resolved;
        let written = tokio::task::spawn_blocking(move || {
            merge_and_write(codec.as_ref(), &path, batch)
        })
        .await??;

        info!("Wrote {} records to {:?}", written, report.path);
        Ok(FlushReport { written, ..report })
    }
}

fn merge_and_write(codec: &dyn Codec, path: &Path, batch: Dataset) -> Result<usize, StoreError> {
    let codec_err = |source: CodecError| StoreError::Codec {
        codec: codec.name(),
        path: path.to_path_buf(),
        source,
    };

    let merged = if path.exists() {
        let existing = codec.read(path).map_err(codec_err)?;
        if existing.columns().is_empty() {
            info!("{:?} holds no columns, replacing it", path);
            dedup(batch)
        } else if !existing.same_shape(&batch) {
            error!(
                "{:?} has {} columns but the new events have {}",
                path,
                existing.columns().len(),
                batch.columns().len()
            );
            return Err(StoreError::SchemaMismatch {
                path: path.to_path_buf(),
                existing: existing.columns().to_vec(),
                incoming: batch.columns().to_vec(),
            });
        } else {
            merge(existing, batch)
        }
    } else {
        info!("No existing file, creating {:?}", path);
        dedup(batch)
    };

    replace_with(codec, path, &merged).map_err(codec_err)?;
    Ok(merged.len())
}

/// Writes `dataset` to a staging file beside `path`, syncs it and renames it
/// over `path`.
fn replace_with(codec: &dyn Codec, path: &Path, dataset: &Dataset) -> Result<(), CodecError> {
    let staging = staging_path(path);
    remove_if_present(&staging).map_err(|e| CodecError::io(&staging, e))?;

    let written = codec.write(&staging, dataset).and_then(|()| {
        File::open(&staging)
            .and_then(|file| file.sync_all())
            .map_err(|e| CodecError::io(&staging, e))?;
        std::fs::rename(&staging, path).map_err(|e| CodecError::io(path, e))
    });
    if let Err(e) = written {
        if let Err(cleanup) = remove_if_present(&staging) {
            warn!("Could not remove {:?}: {}", staging, cleanup);
        }
        return Err(e);
    }

    #[cfg(unix)]
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        // Makes the rename itself durable.
        if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
            warn!("Could not sync directory {:?}: {}", parent, e);
        }
    }
    Ok(())
}

/// `dir/.log.csv.tmp` for `dir/log.csv`.
fn staging_path(path: &Path) -> PathBuf {
    match path.file_name() {
        Some(name) => path.with_file_name(format!(".{}.tmp", name.to_string_lossy())),
        None => path.with_extension("tmp"),
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Existing rows followed by new rows, one row per key, first occurrence
/// wins. A re-observed event therefore keeps its originally persisted payload.
pub fn merge(existing: Dataset, batch: Dataset) -> Dataset {
    let columns = existing.columns().to_vec();
    let rows = existing
        .into_rows()
        .into_iter()
        .chain(batch.into_rows())
        .unique_by(|r| r.key())
        .collect();
    Dataset::with_columns(columns, rows)
}

/// Drops every row whose key already appeared earlier in `dataset`.
pub fn dedup(dataset: Dataset) -> Dataset {
    let columns = dataset.columns().to_vec();
    let rows = dataset.into_rows().into_iter().unique_by(|r| r.key()).collect();
    Dataset::with_columns(columns, rows)
}
