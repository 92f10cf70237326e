//! Engine stubs that count their invocations.

use async_trait::async_trait;
use kiln_cache::ReadResult;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::{
    CssEngine, CssOutput, CssTransformOptions, JsEngine, JsOutput, JsTransformOptions,
};

/// Prefixes the source with a marker. Fails on sources containing `syntax error`.
#[derive(Debug, Default)]
pub struct StubJsEngine {
    pub calls: AtomicUsize,
}

#[async_trait]
impl JsEngine for StubJsEngine {
    async fn transform(
        &self,
        filename: &Path,
        source: &str,
        options: &JsTransformOptions,
    ) -> anyhow::Result<JsOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if source.contains("syntax error") {
            anyhow::bail!("unexpected token in {}", filename.display());
        }
        Ok(JsOutput {
            filename: filename.to_string_lossy().to_string(),
            code: format!("/* transformed */ {}", source),
            map: options.sourcemap.then(|| r#"{"version":3}"#.to_string()),
        })
    }
}

/// Trims the source. Fails on sources containing `fail`.
#[derive(Debug, Default)]
pub struct StubCssEngine {
    pub calls: AtomicUsize,
    warnings: Vec<String>,
}

impl StubCssEngine {
    pub fn with_warnings<I, S>(warnings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            calls: AtomicUsize::new(0),
            warnings: warnings.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CssEngine for StubCssEngine {
    async fn transform(
        &self,
        _filename: Option<&Path>,
        source: &str,
        _imports: &[ReadResult],
        _options: &CssTransformOptions,
    ) -> anyhow::Result<CssOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if source.contains("fail") {
            anyhow::bail!("unclosed block");
        }
        Ok(CssOutput {
            css: source.trim().to_string(),
            warnings: self.warnings.clone(),
        })
    }
}
