use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available Kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Transform CSS and JavaScript sources
    ///
    /// Directories are searched recursively for .css, .js, .mjs and .cjs
    /// files. Each stylesheet is written as <name>.css and <name>.css.js,
    /// each script as <name>.js with an optional source map.
    Build(BuildArgs),

    /// Inspect or clear the transform caches
    Cache(CacheArgs),
}

/// Options shared by every command that reads configuration
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    /// Path to the config file (defaults to ./kiln.config.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the transform caches
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Files or directories to build
    ///
    /// Examples:
    ///   kiln build css
    ///   kiln build src/app.js css/amp.css
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Do not read or write the transform caches
    #[arg(long)]
    pub no_cache: bool,

    /// Keep going when a file fails to compile
    ///
    /// Failures are reported and the build exits with an error once every
    /// other file has been written.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Minify JavaScript output
    #[arg(long)]
    pub minify: bool,

    /// Do not emit JavaScript source maps
    #[arg(long)]
    pub no_sourcemap: bool,

    /// Package metadata file folded into the CSS environment fingerprint
    #[arg(long, value_name = "FILE")]
    pub package_json: Option<PathBuf>,
}

/// Arguments for the cache command
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache maintenance actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheAction {
    /// Show entry counts per cache
    Stats(ConfigArgs),
    /// Remove every persisted entry
    Clear(ConfigArgs),
}

impl CacheAction {
    /// Configuration options of the action.
    pub fn config(&self) -> &ConfigArgs {
        match self {
            CacheAction::Stats(config) | CacheAction::Clear(config) => config,
        }
    }
}
