//! # kiln-transform
//!
//! Cached invocation sites for JavaScript and CSS transforms.
//!
//! Each site reads sources through a shared [`BatchedReader`](kiln_cache::BatchedReader),
//! derives a content-addressed key and runs its engine only on a cache miss.
//!
//! - [`js`]: [`JsTransformer`], keyed on caller, file, content, options and build arguments
//! - [`css`]: [`CssTransformer`], keyed on the stylesheet, its `@import` closure and the
//!   environment fingerprint; inlines local imports and produces `.css` and `.css.js`
//!   artifacts
//! - [`engine`]: the [`JsEngine`] and [`CssEngine`] seams with oxc and lightningcss defaults
//!
//! [`class_names`] is library API for embedders that generate CSS-in-JS rules; the
//! transformers above do not call it.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kiln_cache::{BatchedReader, TransformCache};
//! use kiln_transform::{CssTransformOptions, CssTransformer, LightningCssEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transformer = CssTransformer::new(
//!     BatchedReader::native(),
//!     Arc::new(LightningCssEngine::new()),
//!     CssTransformOptions::default(),
//! )
//! .with_cache(TransformCache::open(".kiln-cache", "css")?)
//! .with_package_json("package.json");
//!
//! let artifact = transformer.jsify("css/amp.css").await?;
//! std::fs::write(format!("build/{}.css.js", artifact.name), artifact.module())?;
//! # Ok(())
//! # }
//! ```

pub mod class_names;
pub mod css;
pub mod engine;
mod error;
pub mod js;

#[cfg(test)]
pub(crate) mod test_utils;

pub use class_names::ClassNameRegistry;
pub use css::{CSS_CACHE_NAME, CssArtifact, CssTransformer, css_module, parse_imports};
pub use engine::{
    CssEngine, CssOutput, CssTransformOptions, DEFAULT_CSS_TARGETS, JsEngine, JsOutput,
    JsTransformOptions, LightningCssEngine, OxcJsEngine,
};
pub use error::TransformError;
pub use js::{JS_CACHE_NAME, JsTransformer};
