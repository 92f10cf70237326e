//! Transform engines.
//!
//! An engine turns one source text into its transformed output. Engines know
//! nothing about caching: the invocation sites in [`crate::js`] and
//! [`crate::css`] call them at most once per cache miss.

use async_trait::async_trait;
use kiln_cache::ReadResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod lightning;
mod oxc;

pub use lightning::LightningCssEngine;
pub use oxc::OxcJsEngine;

/// Browserslist queries used when no targets are configured (mobile first).
pub const DEFAULT_CSS_TARGETS: &[&str] = &[
    "last 5 ChromeAndroid versions",
    "last 5 iOS versions",
    "last 3 FirefoxAndroid versions",
    "last 5 Android versions",
    "last 2 ExplorerMobile versions",
    "last 2 OperaMobile versions",
    "last 2 OperaMini versions",
];

/// Options passed to the JavaScript engine.
///
/// Serialized into every JS cache key, so any field added here invalidates
/// previously cached output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsTransformOptions {
    /// Strip whitespace and comments from the printed output.
    pub minify: bool,
    /// Produce a source map alongside the code.
    pub sourcemap: bool,
}

impl Default for JsTransformOptions {
    fn default() -> Self {
        Self {
            minify: false,
            sourcemap: true,
        }
    }
}

/// Options passed to the CSS engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssTransformOptions {
    /// Minify the stylesheet.
    pub minify: bool,
    /// Browserslist queries used for prefixing and lowering.
    pub targets: Vec<String>,
}

impl Default for CssTransformOptions {
    fn default() -> Self {
        Self {
            minify: true,
            targets: DEFAULT_CSS_TARGETS.iter().map(|q| q.to_string()).collect(),
        }
    }
}

/// Result of a JavaScript transform. This is the payload of the JS cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsOutput {
    /// The file the output was produced from.
    pub filename: String,
    /// Transformed code.
    pub code: String,
    /// Source map as a JSON string, when requested.
    pub map: Option<String>,
}

/// Result of a CSS transform. This is the payload of the CSS cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssOutput {
    /// Transformed stylesheet.
    pub css: String,
    /// Non-fatal problems the engine recovered from.
    pub warnings: Vec<String>,
}

/// A JavaScript transform.
#[async_trait]
pub trait JsEngine: Send + Sync + std::fmt::Debug {
    /// Transform `source`, which was read from `filename`.
    async fn transform(
        &self,
        filename: &Path,
        source: &str,
        options: &JsTransformOptions,
    ) -> anyhow::Result<JsOutput>;
}

/// A CSS transform.
#[async_trait]
pub trait CssEngine: Send + Sync + std::fmt::Debug {
    /// Transform `source`, read from `filename` when it came from a file.
    ///
    /// `imports` holds the already-read `@import` closure of `source`, so an
    /// engine that inlines imports sees exactly the bytes the cache key covers.
    async fn transform(
        &self,
        filename: Option<&Path>,
        source: &str,
        imports: &[ReadResult],
        options: &CssTransformOptions,
    ) -> anyhow::Result<CssOutput>;
}
