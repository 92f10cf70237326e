//! Two-layer transform cache.
//!
//! Each [`TransformCache`] owns one directory `<root>/<name>` holding one JSON
//! document per resolved entry, named `{API_VERSION}_{key}.json`, plus an
//! in-memory map of entries seen during this process.
//!
//! # Lookup order
//!
//! 1. In-memory map (pending or settled entries from this process)
//! 2. Set of on-disk file names, listed once when the cache is opened
//! 3. Miss: the caller computes and registers the result with [`TransformCache::set`]
//!
//! # Invariants
//!
//! - At most one registration per key per instance. A second [`TransformCache::set`]
//!   is a sequencing bug and fails with [`CacheError::DoubleRegistration`].
//! - The pending computation is registered before anything is awaited, so a
//!   concurrent lookup for the same key joins it instead of missing.
//! - A failed computation stays failed for the lifetime of the instance.
//! - Each entry file is written at most once; the first resolution wins.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::{CacheError, CacheResult, SharedError};
use crate::hash::CacheKey;

/// Version baked into every entry file name.
///
/// Bump on any breaking change to the shape of persisted values: older files
/// are never matched again and need no explicit cleanup.
pub const API_VERSION: u32 = 2;

type Computation<T> = Shared<BoxFuture<'static, Result<Arc<T>, SharedError>>>;

/// A pending or settled cache entry.
pub enum CacheEntry<T> {
    /// The computation (or disk read) is still in flight.
    Pending(Computation<T>),
    /// The computation finished successfully.
    Resolved(Arc<T>),
    /// The computation failed. Every waiter sees this error.
    Failed(SharedError),
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, CacheEntry::Pending(_))
    }

    /// Settle a pending entry whose computation has already finished.
    fn settle(self) -> Self {
        match self {
            CacheEntry::Pending(computation) => match computation.peek() {
                Some(Ok(value)) => CacheEntry::Resolved(Arc::clone(value)),
                Some(Err(err)) => CacheEntry::Failed(Arc::clone(err)),
                None => CacheEntry::Pending(computation),
            },
            settled => settled,
        }
    }
}

impl<T> CacheEntry<T>
where
    T: Send + Sync + 'static,
{
    /// Wait for the entry's value.
    pub async fn resolve(self) -> Result<Arc<T>, SharedError> {
        match self {
            CacheEntry::Pending(computation) => computation.await,
            CacheEntry::Resolved(value) => Ok(value),
            CacheEntry::Failed(err) => Err(err),
        }
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        match self {
            CacheEntry::Pending(computation) => CacheEntry::Pending(computation.clone()),
            CacheEntry::Resolved(value) => CacheEntry::Resolved(Arc::clone(value)),
            CacheEntry::Failed(err) => CacheEntry::Failed(Arc::clone(err)),
        }
    }
}

impl<T> std::fmt::Debug for CacheEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheEntry::Pending(_) => f.write_str("Pending"),
            CacheEntry::Resolved(_) => f.write_str("Resolved"),
            CacheEntry::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Entry counts for one cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Name of the cache.
    pub name: String,
    /// Entries registered in memory during this process.
    pub in_memory: usize,
    /// Entry files for the current API version known to be on disk.
    pub on_disk: usize,
}

/// Cache of transform results, in memory and on disk.
///
/// `T` is the result shape for one kind of transform; each kind gets its own
/// instance and directory so readers and writers always agree on the shape.
pub struct TransformCache<T> {
    name: String,
    dir: PathBuf,
    api_version: u32,
    entries: Mutex<FxHashMap<CacheKey, CacheEntry<T>>>,
    /// Entry file names on disk. Listed once at open, extended by our own writes.
    on_disk: Arc<RwLock<FxHashSet<String>>>,
    writes: Mutex<Vec<JoinHandle<()>>>,
}

impl<T> TransformCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Open (creating if needed) the cache named `name` under `root`.
    pub fn open(root: impl AsRef<Path>, name: &str) -> CacheResult<Self> {
        Self::open_with_version(root, name, API_VERSION)
    }

    /// Open the cache with an explicit API version.
    ///
    /// Entries persisted under any other version are invisible to this instance.
    pub fn open_with_version(
        root: impl AsRef<Path>,
        name: &str,
        api_version: u32,
    ) -> CacheResult<Self> {
        let dir = root.as_ref().join(name);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let mut on_disk = FxHashSet::default();
        for entry in std::fs::read_dir(&dir).map_err(|e| CacheError::io(&dir, e))? {
            let entry = entry.map_err(|e| CacheError::io(&dir, e))?;
            if let Some(file_name) = entry.file_name().to_str() {
                on_disk.insert(file_name.to_string());
            }
        }

        tracing::debug!(
            cache = name,
            dir = %dir.display(),
            files = on_disk.len(),
            "opened transform cache"
        );

        Ok(Self {
            name: name.to_string(),
            dir,
            api_version,
            entries: Mutex::new(FxHashMap::default()),
            on_disk: Arc::new(RwLock::new(on_disk)),
            writes: Mutex::new(Vec::new()),
        })
    }

    /// Name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding this cache's entry files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// API version used for entry file names.
    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// File name of the entry for `key`.
    pub fn file_name(&self, key: &CacheKey) -> String {
        format!("{}_{}.json", self.api_version, key)
    }

    /// Look up `key`.
    ///
    /// Returns `None` on a true miss; the caller must compute and [`set`](Self::set).
    /// An entry found only on disk is loaded lazily, and the load is shared by
    /// every caller that asks before it finishes.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let mut entries = self.entries.lock();
        self.lookup(&mut entries, key)
    }

    /// Register the computation for `key`.
    ///
    /// The computation is driven by a background task that persists its value
    /// once it resolves; callers never wait on the disk write. Fails if `key`
    /// was already registered in this process, in which case `computation` is
    /// dropped without being polled.
    pub fn set<F>(&self, key: CacheKey, computation: F) -> CacheResult<CacheEntry<T>>
    where
        F: Future<Output = CacheResult<T>> + Send + 'static,
    {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            tracing::error!(cache = %self.name, %key, "transform registered twice");
            return Err(CacheError::DoubleRegistration {
                cache: self.name.clone(),
                key,
            });
        }
        Ok(self.register(&mut entries, key, computation))
    }

    /// Look up `key`, registering `make()` on a miss.
    ///
    /// The lookup and registration happen under one lock, so concurrent
    /// callers for the same key run `make` at most once between them.
    /// `make` only builds the future; it is not polled until awaited.
    pub fn get_or_insert_with<F, Fut>(&self, key: CacheKey, make: F) -> CacheEntry<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>> + Send + 'static,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = self.lookup(&mut entries, &key) {
            return entry;
        }
        self.register(&mut entries, key, make())
    }

    /// Wait for every background write started so far.
    pub async fn flush(&self) {
        let writes: Vec<_> = std::mem::take(&mut *self.writes.lock());
        for write in writes {
            if let Err(e) = write.await {
                tracing::warn!(cache = %self.name, "cache write task failed: {}", e);
            }
        }
    }

    /// Entry counts for this cache.
    pub fn stats(&self) -> CacheStats {
        let prefix = format!("{}_", self.api_version);
        let on_disk = self
            .on_disk
            .read()
            .iter()
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".json"))
            .count();

        CacheStats {
            name: self.name.clone(),
            in_memory: self.entries.lock().len(),
            on_disk,
        }
    }

    /// Remove every entry file from this cache's directory.
    ///
    /// Entries already loaded in memory are unaffected. Returns the number of
    /// files removed.
    pub fn clear(&self) -> CacheResult<usize> {
        let mut on_disk = self.on_disk.write();
        let mut removed = 0;
        for file_name in on_disk.iter().filter(|name| name.ends_with(".json")) {
            let path = self.dir.join(file_name);
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(path, e)),
            }
        }
        on_disk.retain(|name| !name.ends_with(".json"));

        tracing::debug!(cache = %self.name, removed, "cleared transform cache");
        Ok(removed)
    }

    fn lookup(
        &self,
        entries: &mut FxHashMap<CacheKey, CacheEntry<T>>,
        key: &CacheKey,
    ) -> Option<CacheEntry<T>> {
        if let Some(entry) = entries.remove(key) {
            let entry = entry.settle();
            entries.insert(key.clone(), entry.clone());
            tracing::trace!(cache = %self.name, %key, "memory hit");
            return Some(entry);
        }

        let file_name = self.file_name(key);
        if !self.on_disk.read().contains(&file_name) {
            tracing::trace!(cache = %self.name, %key, "miss");
            return None;
        }

        tracing::trace!(cache = %self.name, %key, "disk hit");
        let path = self.dir.join(file_name);
        let load = async move { read_entry::<T>(&path).await.map(Arc::new).map_err(Arc::new) };
        let entry = CacheEntry::Pending(load.boxed().shared());
        entries.insert(key.clone(), entry.clone());
        Some(entry)
    }

    fn register<F>(
        &self,
        entries: &mut FxHashMap<CacheKey, CacheEntry<T>>,
        key: CacheKey,
        computation: F,
    ) -> CacheEntry<T>
    where
        F: Future<Output = CacheResult<T>> + Send + 'static,
    {
        let computation: Computation<T> = computation
            .map(|result| result.map(Arc::new).map_err(Arc::new))
            .boxed()
            .shared();
        entries.insert(key.clone(), CacheEntry::Pending(computation.clone()));
        tracing::debug!(cache = %self.name, %key, "registered transform");

        self.persist(key, computation.clone());
        CacheEntry::Pending(computation)
    }

    fn persist(&self, key: CacheKey, computation: Computation<T>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                cache = %self.name,
                %key,
                "no async runtime; entry will not be persisted"
            );
            return;
        };

        let file_name = self.file_name(&key);
        let dir = self.dir.clone();
        let on_disk = Arc::clone(&self.on_disk);
        let cache = self.name.clone();

        let write = runtime.spawn(async move {
            let Ok(value) = computation.await else {
                // Failed transforms are never persisted.
                return;
            };
            if on_disk.read().contains(&file_name) {
                return;
            }
            match write_entry(&dir, &file_name, &key, &*value).await {
                Ok(()) => {
                    on_disk.write().insert(file_name);
                }
                Err(e) => {
                    tracing::warn!(cache = %cache, %key, "failed to persist cache entry: {}", e);
                }
            }
        });
        let mut writes = self.writes.lock();
        writes.retain(|write| !write.is_finished());
        writes.push(write);
    }
}

impl<T> std::fmt::Debug for TransformCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformCache")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

async fn read_entry<T: DeserializeOwned>(path: &Path) -> CacheResult<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CacheError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| CacheError::Deserialize {
        path: path.to_path_buf(),
        source,
    })
}

/// Write atomically: temp file first, then rename over the final name.
async fn write_entry<T: Serialize>(
    dir: &Path,
    file_name: &str,
    key: &CacheKey,
    value: &T,
) -> CacheResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|source| CacheError::Serialize {
        key: key.clone(),
        source,
    })?;

    let path = dir.join(file_name);
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, bytes)
        .await
        .map_err(|e| CacheError::io(&temp_path, e))?;
    tokio::fs::rename(&temp_path, &path)
        .await
        .map_err(|e| CacheError::io(&path, e))?;
    Ok(())
}
