use async_trait::async_trait;
use shared::Dataset;
use std::path::Path;

use crate::error::{CodecError, Result};

/// External tool that materializes a single snapshot file.
///
/// `capture` only starts the work. The file appearing at `target` is the sole
/// success signal, so implementations must not report "not ready" as an error.
#[async_trait]
pub trait SnapshotProducer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn capture(&self, target: &Path) -> Result<()>;
}

/// Reads and writes a whole dataset in one physical file format.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    fn read(&self, path: &Path) -> Result<Dataset, CodecError>;

    fn write(&self, path: &Path, dataset: &Dataset) -> Result<(), CodecError>;
}
