//! Error types for cache operations.

use std::path::PathBuf;
use std::sync::Arc;

use crate::hash::CacheKey;

/// Errors that can occur while reading, computing or persisting cache entries.
///
/// None of these are caught inside the crate: read and transform failures
/// ride the shared futures to every waiter, and the invocation site decides
/// whether the build halts.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A file could not be read, written or listed.
    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A source file is not valid UTF-8.
    #[error("{} is not valid UTF-8", .path.display())]
    InvalidUtf8 {
        /// The file that failed to decode.
        path: PathBuf,
    },

    /// A persisted entry could not be deserialized.
    #[error("failed to deserialize cache entry {}: {source}", .path.display())]
    Deserialize {
        /// The entry file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A resolved value could not be serialized for persistence.
    #[error("failed to serialize cache entry {key}: {source}")]
    Serialize {
        /// Key of the entry being persisted.
        key: CacheKey,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// `set` was called for a key that is already registered in this process.
    ///
    /// Two computations raced past the miss check; this is a call-site
    /// sequencing bug, never bad input.
    #[error("read race: attempting to transform {key} twice in cache '{cache}'")]
    DoubleRegistration {
        /// Name of the cache instance.
        cache: String,
        /// The key registered twice.
        key: CacheKey,
    },

    /// The external transform engine failed.
    #[error("transform of {} failed: {source:#}", .file.display())]
    Transform {
        /// The file being transformed.
        file: PathBuf,
        /// The engine error.
        source: anyhow::Error,
    },
}

impl CacheError {
    /// Wrap an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an engine failure with the file it was transforming.
    pub fn transform(file: impl Into<PathBuf>, source: anyhow::Error) -> Self {
        CacheError::Transform {
            file: file.into(),
            source,
        }
    }
}

/// Error carried by shared computations. Every waiter observes the same value.
pub type SharedError = Arc<CacheError>;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
