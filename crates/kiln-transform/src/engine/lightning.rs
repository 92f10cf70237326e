//! CSS engine backed by lightningcss.

use anyhow::Context;
use async_trait::async_trait;
use kiln_cache::ReadResult;
use lightningcss::{
    bundler::{Bundler, ResolveResult, SourceProvider},
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
    targets::{Browsers, Targets},
};
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::{CssEngine, CssOutput, CssTransformOptions};
use crate::css::is_remote;

/// Parses, minifies and prints stylesheets with lightningcss.
///
/// Local `@import` rules are inlined from the import closure handed in by the
/// caller; remote imports stay as they are. Vendor prefixes and syntax
/// lowering follow the configured browserslist targets. Rules the parser
/// cannot understand are dropped and reported as warnings instead of failing
/// the transform.
#[derive(Debug, Default, Clone, Copy)]
pub struct LightningCssEngine;

impl LightningCssEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CssEngine for LightningCssEngine {
    async fn transform(
        &self,
        filename: Option<&Path>,
        source: &str,
        imports: &[ReadResult],
        options: &CssTransformOptions,
    ) -> anyhow::Result<CssOutput> {
        let filename = filename.map(Path::to_path_buf);
        let source = source.to_string();
        let imports = imports.to_vec();
        let options = options.clone();

        tokio::task::spawn_blocking(move || {
            transform_css(filename.as_deref(), &source, &imports, &options)
        })
        .await
        .context("CSS transform task panicked")?
    }
}

/// Serves the entry stylesheet and its already-read import closure to the
/// lightningcss bundler.
struct ClosureProvider {
    files: FxHashMap<PathBuf, Arc<str>>,
}

impl ClosureProvider {
    fn new(entry: &Path, source: &str, imports: &[ReadResult]) -> Self {
        let mut files: FxHashMap<PathBuf, Arc<str>> = imports
            .iter()
            .map(|import| (import.path.clean(), Arc::clone(&import.contents)))
            .collect();
        files.insert(entry.to_path_buf(), Arc::from(source));
        Self { files }
    }
}

impl SourceProvider for ClosureProvider {
    type Error = std::io::Error;

    fn read<'a>(&'a self, file: &Path) -> Result<&'a str, Self::Error> {
        self.files.get(file).map(|contents| &**contents).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not in the import closure", file.display()),
            )
        })
    }

    fn resolve(
        &self,
        specifier: &str,
        originating_file: &Path,
    ) -> Result<ResolveResult, Self::Error> {
        if is_remote(specifier) {
            return Ok(ResolveResult::External(specifier.to_string()));
        }
        let dir = originating_file.parent().unwrap_or_else(|| Path::new(""));
        Ok(ResolveResult::File(dir.join(specifier).clean()))
    }
}

/// Resolve browserslist queries into lightningcss targets.
pub(crate) fn browser_targets(queries: &[String]) -> anyhow::Result<Targets> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| anyhow::anyhow!("Invalid browser targets {:?}: {}", queries, e))?;
    Ok(browsers.map(Targets::from).unwrap_or_default())
}

fn transform_css(
    filename: Option<&Path>,
    source: &str,
    imports: &[ReadResult],
    options: &CssTransformOptions,
) -> anyhow::Result<CssOutput> {
    let targets = browser_targets(&options.targets)?;
    let provider;
    let warnings = Arc::new(RwLock::new(Vec::new()));
    let label = filename
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_default();
    let parser_options = ParserOptions {
        filename: label.clone(),
        error_recovery: true,
        warnings: Some(Arc::clone(&warnings)),
        ..ParserOptions::default()
    };

    let mut stylesheet = match filename {
        Some(entry) if !imports.is_empty() => {
            let entry = entry.clean();
            provider = ClosureProvider::new(&entry, source, imports);
            let mut bundler = Bundler::new(&provider, None, parser_options);
            bundler
                .bundle(&entry)
                .map_err(|e| anyhow::anyhow!("Failed to bundle CSS from {}: {}", label, e))?
        }
        _ => StyleSheet::parse(source, parser_options)
            .map_err(|e| anyhow::anyhow!("Failed to parse CSS from {}: {}", label, e))?,
    };

    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow::anyhow!("Failed to minify CSS from {}: {}", label, e))?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: options.minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow::anyhow!("Failed to print CSS from {}: {}", label, e))?;

    let warnings = warnings
        .read()
        .map(|list| list.iter().map(|w| w.to_string()).collect())
        .unwrap_or_default();

    Ok(CssOutput {
        css: result.code,
        warnings,
    })
}
