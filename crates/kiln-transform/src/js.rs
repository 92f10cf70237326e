//! Cached JavaScript transforms.
//!
//! The cache key of a file digests everything that can change the engine's
//! output for it: the caller, the file name, the content hash, the engine
//! options and the command-line arguments of the build.

use dashmap::DashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_cache::{BatchedReader, CacheError, CacheKey, TransformCache, hash_bytes};

use crate::engine::{JsEngine, JsOutput, JsTransformOptions};
use crate::error::TransformError;

/// Name of the on-disk cache used for JavaScript output.
pub const JS_CACHE_NAME: &str = "js-transform";

#[derive(Serialize)]
struct KeyMaterial<'a> {
    caller: &'a str,
    filename: &'a str,
    hash: &'a CacheKey,
    options: &'a JsTransformOptions,
    argv: &'a [String],
}

/// Runs a [`JsEngine`] over source files, reusing cached output.
#[derive(Debug)]
pub struct JsTransformer {
    reader: BatchedReader,
    engine: Arc<dyn JsEngine>,
    options: JsTransformOptions,
    cache: Option<TransformCache<JsOutput>>,
    caller: String,
    argv: Vec<String>,
    source_maps: DashMap<PathBuf, Option<String>>,
}

impl JsTransformer {
    /// Create an uncached transformer.
    pub fn new(
        reader: BatchedReader,
        engine: Arc<dyn JsEngine>,
        options: JsTransformOptions,
    ) -> Self {
        Self {
            reader,
            engine,
            options,
            cache: None,
            caller: "kiln".to_string(),
            argv: Vec::new(),
            source_maps: DashMap::new(),
        }
    }

    /// Reuse output through `cache`.
    pub fn with_cache(mut self, cache: TransformCache<JsOutput>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Name of the tool invoking the transform. Part of every key.
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    /// Build arguments that influence output. Part of every key.
    pub fn with_argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = argv.into_iter().map(Into::into).collect();
        self
    }

    /// The cache, when caching is enabled.
    pub fn cache(&self) -> Option<&TransformCache<JsOutput>> {
        self.cache.as_ref()
    }

    /// Engine options.
    pub fn options(&self) -> &JsTransformOptions {
        &self.options
    }

    /// Cache key of `filename` with content hash `content_hash`.
    pub fn cache_key(
        &self,
        filename: &Path,
        content_hash: &CacheKey,
    ) -> Result<CacheKey, TransformError> {
        let filename = filename.to_string_lossy();
        let material = KeyMaterial {
            caller: &self.caller,
            filename: &filename,
            hash: content_hash,
            options: &self.options,
            argv: &self.argv,
        };
        Ok(hash_bytes(serde_json::to_vec(&material)?))
    }

    /// Transform the file at `path`.
    ///
    /// Concurrent calls for the same unchanged file share one engine run.
    pub async fn transform(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<JsOutput>, TransformError> {
        let path = path.as_ref();
        let read = self
            .reader
            .read(path)
            .await
            .map_err(|source| TransformError::Read {
                file: path.to_path_buf(),
                source,
            })?;
        let key = self.cache_key(path, &read.hash)?;

        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();
        let file = path.to_path_buf();
        let compute = move || async move {
            tracing::debug!(file = %file.display(), "running javascript engine");
            engine
                .transform(&file, &read.contents, &options)
                .await
                .map_err(|e| CacheError::transform(file.as_path(), e))
        };

        let result = match &self.cache {
            Some(cache) => cache.get_or_insert_with(key, compute).resolve().await,
            None => compute().await.map(Arc::new).map_err(Arc::new),
        };
        let output = result.map_err(|source| TransformError::Failed {
            file: path.to_path_buf(),
            source,
        })?;

        self.source_maps
            .insert(path.to_path_buf(), output.map.clone());
        Ok(output)
    }

    /// Source map recorded for `path` by its last successful transform.
    ///
    /// `None` when the file was never transformed or no map was produced.
    pub fn source_map(&self, path: impl AsRef<Path>) -> Option<String> {
        self.source_maps
            .get(path.as_ref())
            .and_then(|entry| entry.value().clone())
    }

    /// Number of files with a recorded transform.
    pub fn transformed_files(&self) -> usize {
        self.source_maps.len()
    }
}
