//! Memoized environment fingerprints.
//!
//! An environment fingerprint digests static, file-independent build
//! configuration (packaging metadata, fixed transform options). It is
//! computed once per owner and then reused as one component of every key.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{CacheError, CacheResult, SharedError};
use crate::fs::FileSystem;
use crate::hash::{CacheKey, hash_bytes, hash_parts};

/// A fingerprint computed at most once per instance.
///
/// Concurrent first callers wait on the same computation. Its outcome is
/// kept either way: after a failure every later caller gets the same error.
#[derive(Debug, Default)]
pub struct Fingerprint {
    cell: OnceCell<Result<CacheKey, SharedError>>,
}

impl Fingerprint {
    /// Create an empty fingerprint memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fingerprint, if it has been computed.
    pub fn get(&self) -> Option<&CacheKey> {
        self.cell.get().and_then(|result| result.as_ref().ok())
    }

    /// Return the memoized fingerprint, computing it with `compute` on first use.
    pub async fn get_or_compute<F, Fut>(&self, compute: F) -> Result<&CacheKey, SharedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<CacheKey>>,
    {
        self.cell
            .get_or_init(|| async move { compute().await.map_err(Arc::new) })
            .await
            .as_ref()
            .map_err(Arc::clone)
    }
}

/// Digest of the package metadata file and serialized transform options.
pub async fn environment_fingerprint(
    fs: &dyn FileSystem,
    package_json: &Path,
    options_json: &str,
) -> CacheResult<CacheKey> {
    let package = fs
        .read_file(package_json)
        .await
        .map_err(|e| CacheError::io(package_json, e))?;
    let package_hash = hash_bytes(&package);
    Ok(hash_parts([package_hash.as_hex(), options_json]))
}
