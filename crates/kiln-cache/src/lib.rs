//! # kiln-cache
//!
//! Content-addressed caching for source-to-source transforms.
//!
//! The crate decides, for an input (file content plus transform configuration),
//! whether a previously computed output can be reused, and serves concurrent
//! requests for the same input without duplicating work or racing on disk writes.
//!
//! # Architecture
//!
//! - [`hash`]: BLAKE3 digests of byte content and composite key material
//! - [`reader`]: batched file reads, so concurrent readers of one path share one read
//! - [`store`]: [`TransformCache`], an in-memory map layered over a per-cache directory
//!   of `{API_VERSION}_{key}.json` files
//! - [`fingerprint`]: a once-per-instance memo for environment fingerprints
//!
//! # Usage
//!
//! ```rust,no_run
//! use kiln_cache::{TransformCache, hash_parts};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache: TransformCache<String> = TransformCache::open(".kiln-cache", "js-transform")?;
//! let key = hash_parts(["export const x = 1;", "{\"minify\":true}"]);
//!
//! let entry = cache.get_or_insert_with(key, || async { Ok("transformed".to_string()) });
//! let output = entry.resolve().await?;
//! assert_eq!(output.as_str(), "transformed");
//! # Ok(())
//! # }
//! ```

mod error;
pub mod fingerprint;
pub mod fs;
pub mod hash;
pub mod reader;
pub mod store;

pub use error::{CacheError, CacheResult, SharedError};
pub use fingerprint::{Fingerprint, environment_fingerprint};
pub use fs::{FileSystem, NativeFileSystem};
pub use hash::{CacheKey, hash_bytes, hash_parts, short_hash};
pub use reader::{BatchedRead, BatchedReader, ReadResult};
pub use store::{API_VERSION, CacheEntry, CacheStats, TransformCache};
