//! Normalized cache keys.
//!
//! Free-text queries are canonicalized before they touch any cache:
//! lowercase, trimmed, internal whitespace collapsed to single spaces.
//! Scope discriminators (collection ids, unit ids) are sorted and deduped so
//! the key does not depend on the order the caller passes them in.

use sha2::{Digest, Sha256};
use std::fmt;

/// Separates the normalized text from the scope list in the canonical form.
const TEXT_SEPARATOR: char = '\u{1f}';
/// Separates individual scopes in the canonical form.
const SCOPE_SEPARATOR: char = '\u{1e}';

/// Canonicalize free text: case-fold, trim, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for word in lowered.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// A stable, order-independent lookup key for a scoped query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    scopes: Vec<String>,
}

impl CacheKey {
    /// Build a key from raw query text and any number of scope discriminators.
    pub fn new<S: AsRef<str>>(text: &str, scopes: &[S]) -> Self {
        let mut scopes: Vec<String> = scopes
            .iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        scopes.sort();
        scopes.dedup();
        Self {
            text: normalize(text),
            scopes,
        }
    }

    /// Key for an unscoped query.
    pub fn unscoped(text: &str) -> Self {
        Self::new::<&str>(text, &[])
    }

    /// The normalized query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The sorted scope list.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Full canonical string (text + scopes) is injective over (text, scope set).
    pub fn canonical(&self) -> String {
        let mut out = self.text.clone();
        out.push(TEXT_SEPARATOR);
        for (i, scope) in self.scopes.iter().enumerate() {
            if i > 0 {
                out.push(SCOPE_SEPARATOR);
            }
            out.push_str(scope);
        }
        out
    }

    /// Short stable hash of the canonical form (16 hex chars of SHA-256).
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.canonical().as_bytes());
        let mut hex = hex::encode(hash);
        hex.truncate(16);
        hex
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digest())
    }
}
