//! Kiln CLI library.
//!
//! The `kiln` binary is a thin wrapper over these modules; they are exposed
//! so integration tests and embedders can drive commands directly.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result};
