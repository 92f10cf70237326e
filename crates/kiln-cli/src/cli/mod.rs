//! Command-line interface definition for Kiln.
//!
//! # Command Structure
//!
//! - `kiln build` - Transform CSS and JavaScript sources into an output directory
//! - `kiln cache stats` - Show persisted cache entries
//! - `kiln cache clear` - Remove persisted cache entries

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, CacheAction, CacheArgs, Command, ConfigArgs};

/// Kiln - cached CSS and JavaScript builds
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Cached CSS and JavaScript builds",
    long_about = "Kiln transforms stylesheets and scripts and remembers the results.\n\
                  Unchanged inputs are served from a content-addressed cache, so\n\
                  repeated builds only pay for the files that changed."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows cache hits, misses and engine runs.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
