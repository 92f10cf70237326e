//! Salted class names for CSS-in-JS rules.
//!
//! A rule key such as `headerTitle` declared in `src/nav.js` becomes
//! `header-title-1a2b3c4`, where the suffix is the short hash of the file's
//! root-relative path in posix form. The registry rejects a generated name
//! that was already claimed.
//!
//! Nothing in this crate's build path generates rules; embedders that emit
//! CSS-in-JS call the registry from their own transform.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

use kiln_cache::short_hash;

use crate::error::TransformError;

/// Generates class names and enforces their uniqueness across files.
///
/// ```
/// use kiln_transform::ClassNameRegistry;
/// use std::path::Path;
///
/// let registry = ClassNameRegistry::new("/app");
/// let file = Path::new("/app/src/nav.js");
///
/// let name = registry.class_name("headerTitle", file).unwrap();
/// assert!(name.starts_with("header-title-"));
/// assert!(registry.class_name("headerTitle", file).is_err());
///
/// registry.reset_file(file);
/// assert_eq!(registry.class_name("headerTitle", file).unwrap(), name);
/// ```
#[derive(Debug)]
pub struct ClassNameRegistry {
    root: PathBuf,
    claimed: Mutex<FxHashMap<String, PathBuf>>,
}

impl ClassNameRegistry {
    /// Create a registry. File paths are hashed relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            claimed: Mutex::new(FxHashMap::default()),
        }
    }

    /// Claim the salted class name for `rule_key` declared in `file`.
    ///
    /// Every name may be claimed once, even by the file that already owns it;
    /// call [`reset_file`](Self::reset_file) before transforming a file again.
    pub fn class_name(&self, rule_key: &str, file: &Path) -> Result<String, TransformError> {
        let class_name = format!("{}-{}", dash_case(rule_key), self.file_hash(file));

        let mut claimed = self.claimed.lock();
        if let Some(existing) = claimed.get(&class_name) {
            return Err(TransformError::DuplicateClassName {
                class_name,
                file: file.to_path_buf(),
                existing: existing.clone(),
            });
        }
        claimed.insert(class_name.clone(), file.to_path_buf());
        Ok(class_name)
    }

    /// Release every name claimed by `file`, before it is transformed again.
    pub fn reset_file(&self, file: &Path) {
        self.claimed.lock().retain(|_, owner| owner != file);
    }

    /// Number of names currently claimed.
    pub fn len(&self) -> usize {
        self.claimed.lock().len()
    }

    /// Whether no names are claimed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn file_hash(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        short_hash(to_posix(relative))
    }
}

/// Render a path with `/` separators.
pub(crate) fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn dash_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
