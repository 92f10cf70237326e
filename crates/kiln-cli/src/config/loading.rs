use crate::cli::{BuildArgs, ConfigArgs};
use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
    value::{Uncased, UncasedStr},
};
use std::path::Path;

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "kiln.config.json";

impl KilnConfig {
    /// Defaults, then the config file, then `KILN_*` environment variables.
    ///
    /// Words are separated by one underscore and nesting levels by two:
    /// `KILN_CACHE_DIR=.cache`, `KILN_CSS__MINIFY=false`.
    pub fn figment(args: &ConfigArgs) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(KilnConfig::default()));

        let config_file = match &args.config {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.clone()).into());
            }
            Some(path) => Some(path.clone()),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };
        if let Some(path) = config_file {
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(
            Env::prefixed("KILN_")
                .lowercase(false)
                .split("__")
                .map(env_key),
        );

        if let Some(cache_dir) = &args.cache_dir {
            figment = figment.merge(Serialized::default("cacheDir", cache_dir));
        }
        Ok(figment)
    }

    /// Load configuration for commands that only need the shared options.
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        Self::extract(Self::figment(args)?)
    }

    /// Load configuration for `kiln build`. Flags that were passed win.
    pub fn load_for_build(args: &BuildArgs) -> Result<Self> {
        let mut figment = Self::figment(&args.config)?;

        if let Some(out_dir) = &args.out_dir {
            figment = figment.merge(Serialized::default("outDir", out_dir));
        }
        if args.no_cache {
            figment = figment.merge(Serialized::default("cache", false));
        }
        if args.continue_on_error {
            figment = figment.merge(Serialized::default("continueOnError", true));
        }
        if args.minify {
            figment = figment.merge(Serialized::default("js.minify", true));
        }
        if args.no_sourcemap {
            figment = figment.merge(Serialized::default("js.sourcemap", false));
        }
        if let Some(package_json) = &args.package_json {
            figment = figment.merge(Serialized::default("packageJson", package_json));
        }

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }
}

/// `CSS.TARGETS` -> `css.targets`, `CACHE_DIR` -> `cacheDir`.
fn env_key(key: &UncasedStr) -> Uncased<'_> {
    let key = key
        .as_str()
        .split('.')
        .map(camel_case)
        .collect::<Vec<_>>()
        .join(".");
    Uncased::from(key)
}

fn camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper = false;
    for ch in segment.chars() {
        if ch == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(ch.to_ascii_lowercase());
        }
    }
    out
}
