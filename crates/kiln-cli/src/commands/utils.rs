//! Source discovery for the build command.

use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::{BuildError, CliError, Result};

/// What a source file is transformed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    Css,
    Js,
}

/// Classify `path` by extension.
pub(crate) fn source_kind(path: &Path) -> Option<SourceKind> {
    match path.extension()?.to_str()? {
        "css" => Some(SourceKind::Css),
        "js" | "mjs" | "cjs" => Some(SourceKind::Js),
        _ => None,
    }
}

/// Every source file under `paths`, sorted and deduplicated.
///
/// Hidden directories, `node_modules` and the directories in `skip` (the
/// output and cache directories) are not descended into.
pub(crate) fn collect_sources(paths: &[PathBuf], skip: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.clone()));
        }
        if path.is_file() {
            if source_kind(path).is_none() {
                return Err(CliError::InvalidArgument(format!(
                    "{} is not a CSS or JavaScript file",
                    path.display()
                )));
            }
            sources.push(path.clean());
            continue;
        }

        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry, skip));
        for entry in walker {
            let entry = entry.map_err(|e| CliError::Io(e.into()))?;
            if entry.file_type().is_file() && source_kind(entry.path()).is_some() {
                sources.push(entry.path().clean());
            }
        }
    }

    sources.sort();
    sources.dedup();
    Ok(sources)
}

fn is_skipped(entry: &DirEntry, skip: &[PathBuf]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') || name == "node_modules" {
        return true;
    }
    let path = entry.path().clean();
    skip.iter().any(|dir| *dir == path)
}

/// Reject JavaScript sources that would be written to the same output file.
pub(crate) fn check_js_outputs(sources: &[PathBuf]) -> Result<()> {
    let mut outputs: FxHashMap<OsString, &Path> = FxHashMap::default();
    for source in sources {
        if source_kind(source) != Some(SourceKind::Js) {
            continue;
        }
        let Some(name) = source.file_name() else {
            continue;
        };
        if let Some(existing) = outputs.insert(name.to_os_string(), source) {
            return Err(BuildError::OutputCollision {
                name: name.to_string_lossy().to_string(),
                file: source.clone(),
                existing: existing.to_path_buf(),
            }
            .into());
        }
    }
    Ok(())
}
