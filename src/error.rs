use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Raised only by the explicit membership check; lookups never fail.
    #[error("unsupported genre '{genre}'")]
    UnknownGenre { genre: String },

    #[error("duration must be a positive number of seconds, got {0}")]
    InvalidDuration(i64),

    #[error("could not store '{}': {source}", path.display())]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid genre catalog: {0}")]
    Catalog(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
