//! Build command implementation.
//!
//! Every source under the given paths is transformed concurrently. CSS
//! produces `<name>.css` and `<name>.css.js`; JavaScript produces
//! `<name>.js` and, with source maps enabled, `<name>.js.map`.

use futures::future::join_all;
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use kiln_cache::{BatchedReader, TransformCache};
use kiln_transform::{
    CSS_CACHE_NAME, CssTransformer, JS_CACHE_NAME, JsTransformer, LightningCssEngine, OxcJsEngine,
};

use crate::cli::BuildArgs;
use crate::commands::utils::{self, SourceKind};
use crate::config::KilnConfig;
use crate::error::{BuildError, CliError, Result};
use crate::ui;

/// Caller name recorded in every JavaScript cache key.
const CALLER: &str = "kiln";

/// Execute the build command.
///
/// # Errors
///
/// Returns the first file's error unless `continueOnError` is set, in which
/// case failures are reported as they are collected and the build ends with
/// [`BuildError::Incomplete`].
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();
    let config = KilnConfig::load_for_build(&args)?;

    let skip = [config.out_dir.clean(), config.cache_dir.clean()];
    let sources = utils::collect_sources(&args.paths, &skip)?;
    if sources.is_empty() {
        let paths: Vec<String> = args.paths.iter().map(|p| p.display().to_string()).collect();
        return Err(BuildError::NoSources {
            paths: paths.join(", "),
        }
        .into());
    }
    utils::check_js_outputs(&sources)?;
    tracing::debug!(files = sources.len(), out_dir = %config.out_dir.display(), "starting build");

    tokio::fs::create_dir_all(&config.out_dir)
        .await
        .map_err(|source| BuildError::WriteFailed {
            path: config.out_dir.clone(),
            source,
        })?;

    let (css, js) = transformers(&config)?;
    let results = join_all(
        sources
            .iter()
            .map(|source| build_file(&css, &js, &config.out_dir, source)),
    )
    .await;

    if let Some(cache) = css.cache() {
        cache.flush().await;
    }
    if let Some(cache) = js.cache() {
        cache.flush().await;
    }

    let total = sources.len();
    let mut failed = 0;
    for (source, result) in sources.iter().zip(results) {
        let Err(err) = result else {
            continue;
        };
        if !config.continue_on_error {
            return Err(err);
        }
        ui::error(&err.to_string());
        ui::error(&format!("Could not compile {}", source.display()));
        failed += 1;
    }

    ui::step(
        &format!("Compiled {} files into", total - failed),
        &config.out_dir.display().to_string(),
        start_time.elapsed(),
    );

    if failed > 0 {
        return Err(BuildError::Incomplete { failed, total }.into());
    }
    Ok(())
}

/// Both invocation sites, sharing one batched reader.
fn transformers(config: &KilnConfig) -> Result<(CssTransformer, JsTransformer)> {
    let reader = BatchedReader::native();

    let mut css = CssTransformer::new(
        reader.clone(),
        Arc::new(LightningCssEngine::new()),
        config.css.clone(),
    );
    if let Some(package_json) = config.package_json() {
        css = css.with_package_json(package_json);
    }

    let mut js = JsTransformer::new(reader, Arc::new(OxcJsEngine::new()), config.js.clone())
        .with_caller(CALLER)
        .with_argv(std::env::args().skip(1));

    if config.cache {
        css = css.with_cache(TransformCache::open(&config.cache_dir, CSS_CACHE_NAME)?);
        js = js.with_cache(TransformCache::open(&config.cache_dir, JS_CACHE_NAME)?);
    } else {
        tracing::debug!("transform caches disabled");
    }

    Ok((css, js))
}

async fn build_file(
    css: &CssTransformer,
    js: &JsTransformer,
    out_dir: &Path,
    source: &Path,
) -> Result<()> {
    match utils::source_kind(source) {
        Some(SourceKind::Css) => {
            let artifact = css.jsify(source).await?;
            write_output(out_dir.join(format!("{}.css", artifact.name)), &artifact.css).await?;
            write_output(out_dir.join(format!("{}.css.js", artifact.name)), &artifact.module())
                .await?;
        }
        Some(SourceKind::Js) => {
            let output = js.transform(source).await?;
            let file_name = source
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("{} has no file name", source.display()))
                })?;

            match &output.map {
                Some(map) => {
                    let map_name = format!("{}.map", file_name);
                    let code = format!(
                        "{}\n//# sourceMappingURL={}\n",
                        output.code.trim_end(),
                        map_name
                    );
                    write_output(out_dir.join(&file_name), &code).await?;
                    write_output(out_dir.join(map_name), map).await?;
                }
                None => write_output(out_dir.join(&file_name), &output.code).await?,
            }
        }
        None => {
            return Err(CliError::InvalidArgument(format!(
                "{} is not a CSS or JavaScript file",
                source.display()
            )));
        }
    }
    tracing::debug!(file = %source.display(), "compiled");
    Ok(())
}

async fn write_output(path: PathBuf, contents: &str) -> Result<()> {
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| BuildError::WriteFailed { path, source }.into())
}
