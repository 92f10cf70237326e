//! Error handling for the Kiln CLI.
//!
//! `CliError` is the top-level error returned by commands. Domain errors
//! (`ConfigError`, `BuildError`) carry a hint for the user, and library
//! errors convert in through `#[from]`.

mod miette;

pub use self::miette::cli_error_to_miette;

use kiln_cache::CacheError;
use kiln_transform::TransformError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration errors (missing file, invalid values)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build process errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// A file failed to transform
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Cache directory errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Invalid command-line arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Config file not found: {}\n\nHint: Create a kiln.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// The merged configuration could not be extracted
    #[error("Invalid configuration: {0}\n\nHint: Check kiln.config.json and KILN_* environment variables")]
    Invalid(String),
}

/// Build process errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No transformable sources under the given paths
    #[error("No CSS or JavaScript sources found in {paths}\n\nHint: Pass files or directories containing .css, .js, .mjs or .cjs files")]
    NoSources {
        /// The searched paths, comma separated
        paths: String,
    },

    /// Two JavaScript sources would be written to the same output file
    #[error("Output file '{name}' of {} is already produced by {}\n\nHint: Rename one of the files", .file.display(), .existing.display())]
    OutputCollision {
        name: String,
        file: PathBuf,
        existing: PathBuf,
    },

    /// An output file could not be written
    #[error("Failed to write {}: {source}\n\nHint: Check output directory permissions", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Some files failed while --continue-on-error was set
    #[error("{failed} of {total} files could not be compiled")]
    Incomplete {
        failed: usize,
        total: usize,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;
