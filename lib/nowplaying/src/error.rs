use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure to turn a snapshot file into a record.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The snapshot has not been written yet.
    #[error("snapshot not found: {0}")]
    NotFound(PathBuf),

    #[error("malformed snapshot {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Recoverable errors mean "no usable record this poll".
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ParseError::NotFound(_) | ParseError::Malformed { .. })
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("invalid dataset in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

impl CodecError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CodecError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(path: &std::path::Path, message: impl Into<String>) -> Self {
        CodecError::Invalid {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Failure of a flush into the persisted dataset.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(
        "{path} has an incompatible structure with the new events \
         (existing columns: {existing:?}, new columns: {incoming:?}); choose a different file"
    )]
    SchemaMismatch {
        path: PathBuf,
        existing: Vec<String>,
        incoming: Vec<String>,
    },

    #[error("codec {codec} failed on {path}: {source}")]
    Codec {
        codec: &'static str,
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Invalid codec registry configuration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a codec registry needs at least one codec")]
    Empty,

    #[error("fallback extension `{0}` has no registered codec")]
    MissingFallback(String),
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("failed to start producer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("producer command is empty")]
    EmptyCommand,
}

/// Failures that end a logging run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Producer(#[from] ProducerError),
}
