//! Command implementations for the Kiln CLI.
//!
//! - [`build`] - Transform sources into the output directory
//! - [`cache`] - Inspect or clear the transform caches

pub mod build;
pub mod cache;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use cache::execute as cache_execute;
