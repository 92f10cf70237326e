//! Batched file reads.
//!
//! Bundler hooks may ask for the same file several times while one read is
//! still in flight. [`BatchedReader`] collapses those requests into a single
//! read and forgets the read as soon as it settles, so the next request after
//! an edit sees fresh content.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CacheError, SharedError};
use crate::fs::{FileSystem, NativeFileSystem};
use crate::hash::{CacheKey, hash_bytes};

/// Contents and content hash of one file read.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Path that was read.
    pub path: PathBuf,
    /// UTF-8 contents of the file.
    pub contents: Arc<str>,
    /// Digest of the contents.
    pub hash: CacheKey,
}

/// A read shared by every caller that asked for the same path while it was in flight.
pub type BatchedRead = Shared<BoxFuture<'static, Result<ReadResult, SharedError>>>;

type InFlight = Arc<Mutex<FxHashMap<PathBuf, BatchedRead>>>;

/// Deduplicates concurrent reads of the same path.
#[derive(Clone)]
pub struct BatchedReader {
    fs: Arc<dyn FileSystem>,
    in_flight: InFlight,
}

impl BatchedReader {
    /// Create a reader over the given file system.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            in_flight: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Create a reader over the native file system.
    pub fn native() -> Self {
        Self::new(Arc::new(NativeFileSystem))
    }

    /// The file system reads are issued against.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Read `path`, joining a read already in flight for it.
    ///
    /// The read is registered before this returns, so a second call made
    /// before the first result is awaited shares the same underlying read.
    pub fn read(&self, path: impl AsRef<Path>) -> BatchedRead {
        let path = path.as_ref().to_path_buf();
        let mut in_flight = self.in_flight.lock();
        if let Some(read) = in_flight.get(&path) {
            tracing::trace!(path = %path.display(), "joining in-flight read");
            return read.clone();
        }

        let fs = Arc::clone(&self.fs);
        let registry = Arc::clone(&self.in_flight);
        let target = path.clone();
        let settle = async move {
            let result = load(fs.as_ref(), &target).await.map_err(Arc::new);
            // Settled: the next read of this path must hit the disk again.
            registry.lock().remove(&target);
            result
        };

        // On a runtime the read is its own task, so it settles and deregisters
        // even when every waiter drops it half-polled.
        let read = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(settle);
                let registry = Arc::clone(&self.in_flight);
                let target = path.clone();
                async move {
                    task.await.unwrap_or_else(|e| {
                        registry.lock().remove(&target);
                        Err(Arc::new(CacheError::io(&target, std::io::Error::other(e))))
                    })
                }
                .boxed()
            }
            Err(_) => settle.boxed(),
        }
        .shared();

        in_flight.insert(path, read.clone());
        read
    }

    /// Number of reads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl Default for BatchedReader {
    fn default() -> Self {
        Self::native()
    }
}

impl std::fmt::Debug for BatchedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchedReader")
            .field("fs", &self.fs)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

async fn load(fs: &dyn FileSystem, path: &Path) -> Result<ReadResult, CacheError> {
    let bytes = fs
        .read_file(path)
        .await
        .map_err(|e| CacheError::io(path, e))?;
    let hash = hash_bytes(&bytes);
    let contents = String::from_utf8(bytes).map_err(|_| CacheError::InvalidUtf8 {
        path: path.to_path_buf(),
    })?;

    Ok(ReadResult {
        path: path.to_path_buf(),
        contents: Arc::from(contents),
        hash,
    })
}


#[cfg(test)]
mod tests {
    use super::test_utils::CountingFs;
    use super::*;

    #[tokio::test]
    async fn test_concurrent_reads_collapse() {
        let fs = Arc::new(CountingFs::with_file("a.css", ".a { color: red }"));
        let reader = BatchedReader::new(fs.clone());

        let (r1, r2, r3) = tokio::join!(
            reader.read("a.css"),
            reader.read("a.css"),
            reader.read("a.css")
        );

        assert_eq!(fs.reads(), 1);
        let r1 = r1.unwrap();
        assert_eq!(&*r1.contents, ".a { color: red }");
        assert_eq!(r1.hash, r2.unwrap().hash);
        assert_eq!(r1.hash, r3.unwrap().hash);
        assert_eq!(reader.in_flight(), 0);

        // Settled reads are forgotten; a later read goes back to the file system.
        reader.read("a.css").await.unwrap();
        assert_eq!(fs.reads(), 2);
    }

    #[tokio::test]
    async fn test_read_after_edit_sees_new_content() {
        let fs = Arc::new(CountingFs::with_file("a.css", ".a { color: red }"));
        let reader = BatchedReader::new(fs.clone());

        let first = reader.read("a.css").await.unwrap();
        fs.write("a.css", ".a { color: blue }");
        let second = reader.read("a.css").await.unwrap();

        assert_eq!(&*second.contents, ".a { color: blue }");
        assert_ne!(first.hash, second.hash);
    }

    #[tokio::test]
    async fn test_different_paths_read_separately() {
        let fs = Arc::new(CountingFs::with_file("a.css", "a"));
        fs.write("b.css", "b");
        let reader = BatchedReader::new(fs.clone());

        let (a, b) = tokio::join!(reader.read("a.css"), reader.read("b.css"));

        assert_eq!(&*a.unwrap().contents, "a");
        assert_eq!(&*b.unwrap().contents, "b");
        assert_eq!(fs.reads(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_retried() {
        let fs = Arc::new(CountingFs::default());
        let reader = BatchedReader::new(fs.clone());

        let (r1, r2) = tokio::join!(reader.read("missing.css"), reader.read("missing.css"));

        let (e1, e2) = (r1.unwrap_err(), r2.unwrap_err());
        assert!(Arc::ptr_eq(&e1, &e2));
        assert!(matches!(*e1, CacheError::Io { .. }));
        assert_eq!(fs.reads(), 1);
        assert_eq!(reader.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_error() {
        let fs = Arc::new(CountingFs::with_file("bin.css", vec![0xff, 0xfe, 0x00]));
        let reader = BatchedReader::new(fs);

        let err = reader.read("bin.css").await.unwrap_err();
        assert!(matches!(*err, CacheError::InvalidUtf8 { .. }));
    }

    #[tokio::test]
    async fn test_abandoned_read_still_deregisters() {
        let fs = Arc::new(CountingFs::with_file("a.css", "old"));
        let reader = BatchedReader::new(fs.clone());

        let abandoned = reader.read("a.css");
        assert!(abandoned.clone().now_or_never().is_none());
        drop(abandoned);

        for _ in 0..100 {
            if reader.in_flight() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(reader.in_flight(), 0);

        fs.write("a.css", "new");
        let fresh = reader.read("a.css").await.unwrap();
        assert_eq!(&*fresh.contents, "new");
        assert_eq!(fs.reads(), 2);
    }

    #[test]
    fn test_reads_without_runtime_run_inline() {
        let fs = Arc::new(CountingFs::with_file("a.css", "a"));
        let reader = BatchedReader::new(fs.clone());

        let result = futures::executor::block_on(reader.read("a.css")).unwrap();
        assert_eq!(&*result.contents, "a");
        assert_eq!(reader.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_registration_is_synchronous() {
        let fs = Arc::new(CountingFs::with_file("a.css", "a"));
        let reader = BatchedReader::new(fs.clone());

        let pending = reader.read("a.css");
        assert_eq!(reader.in_flight(), 1);
        let joined = reader.read("a.css");

        pending.await.unwrap();
        joined.await.unwrap();
        assert_eq!(fs.reads(), 1);
    }
}
