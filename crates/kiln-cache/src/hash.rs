//! Cache key computation using BLAKE3 content-addressed hashing.
//!
//! A key is the digest of one or more parts fed to the hasher in the order
//! given. Order matters: `hash_parts(["a", "b"])` and `hash_parts(["b", "a"])`
//! are different keys, so every call site fixes its own canonical ordering.

use blake3::Hasher;
use serde::{Deserialize, Serialize};

/// Width of the short digest used for human-facing identifiers.
pub const SHORT_HASH_LEN: usize = 7;

/// Content-addressed cache key (BLAKE3 hex digest).
///
/// Keys are opaque: nothing ever parses structure back out of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a cache key from a hex string.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Get the cache key as a hex string.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<[u8]> for CacheKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Hash a sequence of parts, concatenated in iteration order.
///
/// Parts are fed to the hasher back to back with no separator, so callers
/// that need unambiguous boundaries should hash a serialized structure.
pub fn hash_parts<I, P>(parts: I) -> CacheKey
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    CacheKey(hasher.finalize().to_hex().to_string())
}

/// Hash a single byte sequence.
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> CacheKey {
    CacheKey(blake3::hash(bytes.as_ref()).to_hex().to_string())
}

/// Short (7 character) digest of `bytes`, a truncation of [`hash_bytes`].
pub fn short_hash(bytes: impl AsRef<[u8]>) -> String {
    let full = hash_bytes(bytes);
    full.as_hex()[..SHORT_HASH_LEN].to_string()
}
