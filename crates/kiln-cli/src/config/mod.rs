//! Configuration for Kiln with multi-source loading.
//!
//! Priority: CLI > Environment (`KILN_*`) > File (`kiln.config.json`) > Defaults

mod loading;

use kiln_transform::{CssTransformOptions, JsTransformOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use loading::CONFIG_FILE_NAME;

/// Kiln configuration, as read from kiln.config.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KilnConfig {
    /// Root directory of the transform caches
    pub cache_dir: PathBuf,

    /// Output directory of `kiln build`
    pub out_dir: PathBuf,

    /// Read and write the transform caches
    pub cache: bool,

    /// Report failing files and keep building
    pub continue_on_error: bool,

    /// Package metadata folded into the CSS environment fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_json: Option<PathBuf>,

    /// CSS engine options
    pub css: CssTransformOptions,

    /// JavaScript engine options
    pub js: JsTransformOptions,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".kiln-cache"),
            out_dir: PathBuf::from("build"),
            cache: true,
            continue_on_error: false,
            package_json: None,
            css: CssTransformOptions::default(),
            js: JsTransformOptions::default(),
        }
    }
}

impl KilnConfig {
    /// The package metadata file to fingerprint: the configured one, or
    /// `./package.json` when it exists.
    pub fn package_json(&self) -> Option<PathBuf> {
        self.package_json.clone().or_else(|| {
            let default_path = Path::new("package.json");
            default_path.exists().then(|| default_path.to_path_buf())
        })
    }
}
