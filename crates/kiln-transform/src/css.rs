//! Cached CSS transforms.
//!
//! A stylesheet's cache key covers its own content, the content of every file
//! in its `@import` closure and the environment fingerprint (packaging
//! metadata plus engine options). Editing any imported file therefore
//! invalidates every stylesheet that reaches it.

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use parking_lot::Mutex;
use path_clean::PathClean;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use kiln_cache::{
    BatchedReader, CacheError, CacheKey, Fingerprint, ReadResult, TransformCache,
    environment_fingerprint, hash_bytes, hash_parts,
};

use crate::class_names::to_posix;
use crate::engine::{CssEngine, CssOutput, CssTransformOptions};
use crate::error::TransformError;

/// Name of the on-disk cache used for CSS output.
pub const CSS_CACHE_NAME: &str = "css";

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid comment pattern"));

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?(?:"([^"]*)"|'([^']*)'|([^\s'");]+))"#)
        .expect("valid import pattern")
});

/// The `@import` specifiers of a stylesheet that refer to local files.
///
/// Both the string and `url()` forms are recognized. Imports inside comments
/// and remote imports (`http:`, `https:`, protocol-relative, `data:`) are
/// skipped.
pub fn parse_imports(contents: &str) -> Vec<String> {
    let contents = COMMENT_RE.replace_all(contents, "");
    IMPORT_RE
        .captures_iter(&contents)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|specifier| !specifier.is_empty() && !is_remote(specifier))
        .collect()
}

pub(crate) fn is_remote(specifier: &str) -> bool {
    specifier.starts_with("http:")
        || specifier.starts_with("https:")
        || specifier.starts_with("//")
        || specifier.starts_with("data:")
}

/// Render the `.css.js` module that exports a stylesheet as a string.
pub fn css_module(css: &str) -> String {
    format!(
        "export const CSS = {};\n",
        serde_json::Value::String(css.to_string())
    )
}

/// A stylesheet ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssArtifact {
    /// Output name, the file stem of the source.
    pub name: String,
    /// The source file.
    pub source: PathBuf,
    /// Transformed CSS with its `sourceURL` trailer.
    pub css: String,
}

impl CssArtifact {
    /// The `.css.js` module for this stylesheet.
    pub fn module(&self) -> String {
        css_module(&self.css)
    }
}

/// Runs a [`CssEngine`] over stylesheets, reusing cached output.
#[derive(Debug)]
pub struct CssTransformer {
    reader: BatchedReader,
    engine: Arc<dyn CssEngine>,
    options: CssTransformOptions,
    cache: Option<TransformCache<CssOutput>>,
    package_json: Option<PathBuf>,
    environment: Fingerprint,
    outputs: Mutex<FxHashMap<String, PathBuf>>,
}

impl CssTransformer {
    /// Create an uncached transformer.
    pub fn new(
        reader: BatchedReader,
        engine: Arc<dyn CssEngine>,
        options: CssTransformOptions,
    ) -> Self {
        Self {
            reader,
            engine,
            options,
            cache: None,
            package_json: None,
            environment: Fingerprint::new(),
            outputs: Mutex::new(FxHashMap::default()),
        }
    }

    /// Reuse output through `cache`.
    pub fn with_cache(mut self, cache: TransformCache<CssOutput>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fold the package metadata file at `path` into the environment fingerprint.
    pub fn with_package_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.package_json = Some(path.into());
        self
    }

    /// The cache, when caching is enabled.
    pub fn cache(&self) -> Option<&TransformCache<CssOutput>> {
        self.cache.as_ref()
    }

    /// Engine options.
    pub fn options(&self) -> &CssTransformOptions {
        &self.options
    }

    /// Transitive `@import` closure of `path`, depth first.
    ///
    /// A file imported from several places appears once per import. An import
    /// of a file that is already on the current import chain is not followed.
    pub async fn css_imports(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>, TransformError> {
        let path = path.as_ref().to_path_buf().clean();
        self.collect_imports(path, Vec::new()).await
    }

    fn collect_imports(
        &self,
        file: PathBuf,
        mut chain: Vec<PathBuf>,
    ) -> BoxFuture<'_, Result<Vec<PathBuf>, TransformError>> {
        async move {
            let read = self.read(&file).await?;
            let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
            let top_level: Vec<PathBuf> = parse_imports(&read.contents)
                .into_iter()
                .map(|specifier| dir.join(specifier).clean())
                .filter(|import| *import != file && !chain.contains(import))
                .collect();
            if top_level.is_empty() {
                return Ok(top_level);
            }

            chain.push(file);
            let nested = try_join_all(
                top_level
                    .iter()
                    .map(|import| self.collect_imports(import.clone(), chain.clone())),
            )
            .await?;

            let mut imports = top_level;
            imports.extend(nested.into_iter().flatten());
            Ok(imports)
        }
        .boxed()
    }

    /// Fingerprint of the package metadata and engine options, computed once.
    ///
    /// A failure is memoized too: a missing package metadata file fails every
    /// transform of this transformer with the same error.
    pub async fn environment_hash(&self) -> Result<CacheKey, TransformError> {
        let options_json = serde_json::to_string(&self.options)?;
        let key = self
            .environment
            .get_or_compute(|| async {
                match &self.package_json {
                    Some(package_json) => {
                        environment_fingerprint(
                            self.reader.file_system().as_ref(),
                            package_json,
                            &options_json,
                        )
                        .await
                    }
                    None => Ok(hash_bytes(&options_json)),
                }
            })
            .await
            .map_err(|source| TransformError::Read {
                file: self.package_json.clone().unwrap_or_default(),
                source,
            })?;
        Ok(key.clone())
    }

    /// Cache key for the stylesheet at `path` in its current state.
    pub async fn cache_key(&self, path: impl AsRef<Path>) -> Result<CacheKey, TransformError> {
        let (_, _, key) = self.keyed_read(path.as_ref()).await?;
        Ok(key)
    }

    /// The stylesheet, its import closure and the key covering both.
    async fn keyed_read(
        &self,
        path: &Path,
    ) -> Result<(ReadResult, Vec<ReadResult>, CacheKey), TransformError> {
        let (read, imports, environment) = futures::try_join!(
            self.read(path),
            self.css_imports(path),
            self.environment_hash()
        )?;
        let import_reads = try_join_all(imports.iter().map(|import| self.read(import))).await?;

        let key = hash_parts(
            std::iter::once(&read.hash)
                .chain(import_reads.iter().map(|import| &import.hash))
                .chain(std::iter::once(&environment)),
        );
        Ok((read, import_reads, key))
    }

    /// Transform the stylesheet at `path`, inlining its local imports.
    pub async fn transform_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<CssOutput>, TransformError> {
        let path = path.as_ref();
        let (read, imports, key) = self.keyed_read(path).await?;
        self.run(key, Some(path), read.contents, imports).await
    }

    /// Transform a stylesheet that does not live in a file.
    ///
    /// The key covers the text and the environment; imports are not followed.
    pub async fn transform_string(
        &self,
        contents: &str,
        filename: Option<&Path>,
    ) -> Result<Arc<CssOutput>, TransformError> {
        let environment = self.environment_hash().await?;
        let key = hash_parts([hash_bytes(contents), environment]);
        self.run(key, filename, Arc::from(contents), Vec::new()).await
    }

    async fn run(
        &self,
        key: CacheKey,
        filename: Option<&Path>,
        contents: Arc<str>,
        imports: Vec<ReadResult>,
    ) -> Result<Arc<CssOutput>, TransformError> {
        let label = filename
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("<inline css>"));

        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();
        let file = filename.map(Path::to_path_buf);
        let error_label = label.clone();
        let compute = move || async move {
            tracing::debug!(file = %error_label.display(), "running css engine");
            engine
                .transform(file.as_deref(), &contents, &imports, &options)
                .await
                .map_err(|e| CacheError::transform(error_label, e))
        };

        let result = match &self.cache {
            Some(cache) => cache.get_or_insert_with(key, compute).resolve().await,
            None => compute().await.map(Arc::new).map_err(Arc::new),
        };
        result.map_err(|source| TransformError::Failed {
            file: label,
            source,
        })
    }

    /// Transform `path` into an output artifact.
    ///
    /// Engine warnings are logged. The artifact name must not be in use by a
    /// different source file of this transformer.
    pub async fn jsify(&self, path: impl AsRef<Path>) -> Result<CssArtifact, TransformError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        self.claim_output(&name, path)?;

        let output = self.transform_file(path).await?;
        for warning in &output.warnings {
            tracing::warn!(file = %path.display(), "{}", warning);
        }

        let css = format!(
            "{}\n/*# sourceURL=/{}*/",
            output.css,
            to_posix(path).trim_start_matches('/')
        );
        Ok(CssArtifact {
            name,
            source: path.to_path_buf(),
            css,
        })
    }

    fn claim_output(&self, name: &str, path: &Path) -> Result<(), TransformError> {
        let mut outputs = self.outputs.lock();
        match outputs.get(name) {
            Some(existing) if existing != path => Err(TransformError::DuplicateOutput {
                name: name.to_string(),
                file: path.to_path_buf(),
                existing: existing.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                outputs.insert(name.to_string(), path.to_path_buf());
                Ok(())
            }
        }
    }

    async fn read(&self, path: &Path) -> Result<ReadResult, TransformError> {
        self.reader
            .read(path)
            .await
            .map_err(|source| TransformError::Read {
                file: path.to_path_buf(),
                source,
            })
    }
}
