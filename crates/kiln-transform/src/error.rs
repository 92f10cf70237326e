//! Error types for the transform sites.

use kiln_cache::{CacheError, SharedError};
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while transforming a source file.
///
/// Read and engine failures are shared: every caller waiting on the same
/// cache entry receives the same [`SharedError`].
#[derive(Error, Debug, Diagnostic)]
pub enum TransformError {
    /// A source file (or one of its CSS imports) could not be read.
    #[error("failed to read {}: {source}", .file.display())]
    #[diagnostic(
        code(kiln::transform::read_failed),
        help("Check that the file exists and is valid UTF-8")
    )]
    Read {
        file: PathBuf,
        #[source]
        source: SharedError,
    },

    /// Cache bookkeeping failed (environment fingerprint, key registration).
    #[error(transparent)]
    #[diagnostic(code(kiln::transform::cache))]
    Cache(#[from] CacheError),

    /// The engine rejected the file.
    #[error("could not compile {}: {source}", .file.display())]
    #[diagnostic(code(kiln::transform::failed))]
    Failed {
        file: PathBuf,
        #[source]
        source: SharedError,
    },

    /// Two different source files produce the same output artifact name.
    #[error("output name '{name}' of {} is already used by {}", .file.display(), .existing.display())]
    #[diagnostic(
        code(kiln::transform::duplicate_output),
        help("Rename one of the files; output names must be unique across a build")
    )]
    DuplicateOutput {
        name: String,
        file: PathBuf,
        existing: PathBuf,
    },

    /// A generated class name is already claimed by another file.
    #[error("class names must be unique across all files, found a duplicate: {class_name} in {} (first defined in {})", .file.display(), .existing.display())]
    #[diagnostic(code(kiln::transform::duplicate_class_name))]
    DuplicateClassName {
        class_name: String,
        file: PathBuf,
        existing: PathBuf,
    },

    /// Transform options could not be serialized into key material.
    #[error("failed to serialize transform options: {0}")]
    #[diagnostic(code(kiln::transform::options))]
    Options(#[from] serde_json::Error),
}

impl TransformError {
    /// The source file this error is about, when there is one.
    pub fn file(&self) -> Option<&std::path::Path> {
        match self {
            TransformError::Read { file, .. }
            | TransformError::Failed { file, .. }
            | TransformError::DuplicateOutput { file, .. }
            | TransformError::DuplicateClassName { file, .. } => Some(file),
            TransformError::Cache(_) | TransformError::Options(_) => None,
        }
    }
}
