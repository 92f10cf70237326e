//! JavaScript engine backed by oxc.

use anyhow::Context;
use async_trait::async_trait;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::{Path, PathBuf};

use super::{JsEngine, JsOutput, JsTransformOptions};

/// Parses with `oxc_parser` and prints with `oxc_codegen`.
///
/// Parse errors fail the transform. Parsing and printing run on the blocking
/// pool since both are CPU bound.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcJsEngine;

impl OxcJsEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JsEngine for OxcJsEngine {
    async fn transform(
        &self,
        filename: &Path,
        source: &str,
        options: &JsTransformOptions,
    ) -> anyhow::Result<JsOutput> {
        let filename = filename.to_path_buf();
        let source = source.to_string();
        let options = options.clone();

        tokio::task::spawn_blocking(move || transform_js(&filename, &source, &options))
            .await
            .context("JavaScript transform task panicked")?
    }
}

fn transform_js(
    filename: &Path,
    source: &str,
    options: &JsTransformOptions,
) -> anyhow::Result<JsOutput> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(filename).unwrap_or(SourceType::mjs());

    let parse_result = Parser::new(&allocator, source, source_type).parse();
    if !parse_result.errors.is_empty() {
        let error_messages: Vec<String> = parse_result
            .errors
            .iter()
            .map(|e| format!("{:?}", e))
            .collect();
        anyhow::bail!(
            "Failed to parse {}: {}",
            filename.display(),
            error_messages.join(", ")
        );
    }

    let source_map_path: Option<PathBuf> = options.sourcemap.then(|| filename.to_path_buf());
    let printed = Codegen::new()
        .with_options(CodegenOptions {
            minify: options.minify,
            source_map_path,
            ..CodegenOptions::default()
        })
        .build(&parse_result.program);

    Ok(JsOutput {
        filename: filename.to_string_lossy().to_string(),
        code: printed.code,
        map: printed.map.map(|map| map.to_json_string()),
    })
}
