// src/identifier.rs
//
// Canonicalization of token identifiers. Upstream providers disagree on the
// textual form of a contract hash (prefixed, unprefixed, mixed case); every
// comparison in the SDK goes through the canonical form produced here.

use serde::{Deserialize, Serialize};

/// Known identifier prefixes, longest first so that longest-match wins
/// (`contract-package-wasm...` must not be stripped as `contract-`).
pub const KNOWN_PREFIXES: [&str; 5] = [
    "contract-package-wasm",
    "contract-package-",
    "account-hash-",
    "contract-",
    "hash-",
];

/// Number of leading canonical characters compared in the prefix-overlap
/// fallback used by catalog matching (tolerates truncated identifiers).
pub const OVERLAP_PREFIX_LEN: usize = 16;

/// A token identifier in canonical form, plus the raw string it came from.
///
/// Canonicalization strips any known prefix and lower-cases the remainder.
/// It is idempotent: `canon(canon(x)) == canon(x)`. Inputs that match no
/// known pattern are lower-cased and passed through unchanged; there is no
/// failure mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenIdentifier {
    raw: String,
    canonical: String,
}

impl TokenIdentifier {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            canonical: canonicalize(raw),
        }
    }

    /// The canonical (prefix-stripped, lower-cased) form.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The raw string this identifier was built from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the canonical form looks like a full 64-char hex hash.
    /// Adapters use this to skip hash-keyed endpoints for name-like input.
    pub fn is_hash_like(&self) -> bool {
        self.canonical.len() == 64 && hex::decode(&self.canonical).is_ok()
    }

    /// True when `other` canonicalizes to the same value, or when the two
    /// canonical forms agree on their first [`OVERLAP_PREFIX_LEN`] chars.
    /// The overlap rule tolerates identifiers truncated by callers.
    pub fn matches(&self, other: &str) -> bool {
        let other = canonicalize(other);
        if self.canonical == other {
            return true;
        }
        if self.canonical.len() < OVERLAP_PREFIX_LEN || other.len() < OVERLAP_PREFIX_LEN {
            return false;
        }
        // Byte comparison: canonical hashes are ASCII, and byte slicing
        // cannot panic on the odd non-ASCII input.
        self.canonical.as_bytes()[..OVERLAP_PREFIX_LEN] == other.as_bytes()[..OVERLAP_PREFIX_LEN]
    }
}

impl std::fmt::Display for TokenIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Strip the longest known prefix and lower-case the remainder.
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    for prefix in KNOWN_PREFIXES {
        if let Some(rest) = strip_prefix_ignore_case(trimmed, prefix) {
            return rest.to_lowercase();
        }
    }
    trimmed.to_lowercase()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() < prefix.len() {
        return None;
    }
    // Prefixes are pure ASCII; a byte match therefore also guarantees the
    // split point is a char boundary.
    if s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes()) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "40bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f";

    #[test]
    fn test_prefix_variants_canonicalize_equal() {
        let variants = [
            HASH.to_string(),
            format!("hash-{}", HASH),
            format!("contract-{}", HASH),
            format!("contract-package-{}", HASH),
            format!("contract-package-wasm{}", HASH),
            HASH.to_uppercase(),
            format!("Hash-{}", HASH.to_uppercase()),
        ];
        for v in &variants {
            assert_eq!(canonicalize(v), HASH, "variant {} should canonicalize", v);
        }
    }

    #[test]
    fn test_canonicalize_idempotent() {
        let once = canonicalize(&format!("contract-package-{}", HASH));
        assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn test_unknown_pattern_passes_through() {
        assert_eq!(canonicalize("MoonToken"), "moontoken");
        assert_eq!(canonicalize(""), "");
    }

    #[test]
    fn test_hash_like_detection() {
        assert!(TokenIdentifier::new(HASH).is_hash_like());
        assert!(TokenIdentifier::new(&format!("hash-{}", HASH)).is_hash_like());
        assert!(!TokenIdentifier::new("MoonToken").is_hash_like());
        assert!(!TokenIdentifier::new(&HASH[..32]).is_hash_like());
    }

    #[test]
    fn test_prefix_overlap_matching() {
        let id = TokenIdentifier::new(HASH);
        assert!(id.matches(&format!("hash-{}", HASH)));
        // Truncated caller identifier: first 16 chars agree
        assert!(id.matches(&HASH[..20]));
        assert!(!id.matches("deadbeefdeadbeefdeadbeef"));
        // Too short for the overlap rule
        assert!(!id.matches(&HASH[..8]));
    }
}
