//! File system abstraction for source reads.
//!
//! Reads of source files go through [`FileSystem`] so that tests can count
//! and delay the underlying I/O. The cache directory itself is owned by
//! [`TransformCache`](crate::TransformCache) and does not go through here.

use async_trait::async_trait;
use std::path::Path;

/// Byte-exact access to source files.
#[async_trait]
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Read the full contents of the file at `path`.
    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// [`FileSystem`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileSystem;

#[async_trait]
impl FileSystem for NativeFileSystem {
    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || std::fs::read(&path))
            .await
            .map_err(|e| std::io::Error::other(format!("Task join error: {}", e)))?
    }
}
