//! Query id to storage key encoding.
//!
//! Query ids are usually base64 content hashes, whose alphabet includes `/`
//! and `+` and whose tail may carry `=` padding. The encoding rewrites them
//! into the base64url alphabet and drops the padding:
//!
//! - `/` becomes `-`
//! - `+` becomes `_`
//! - the first `=` ends the scan; everything after it is discarded
//! - every other character is copied unchanged
//!
//! and then appends [`STORAGE_KEY_SUFFIX`].
//!
//! `=` is reserved as a truncation marker, not a generic character: `a=b`
//! and `a=c` share the key `a.graphql`. Deployed stores depend on this exact
//! mapping, so it must not be changed to an escaping scheme.

use std::fmt;

use serde::Serialize;

/// Extension appended to every storage key.
pub const STORAGE_KEY_SUFFIX: &str = ".graphql";

/// Object key under which a persisted query is stored in a backend.
///
/// Only produced by [`encode_query_id`]; there is no way back to the
/// originating query id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The encoded id without the [`STORAGE_KEY_SUFFIX`].
    pub fn stem(&self) -> &str {
        &self.0[..self.0.len() - STORAGE_KEY_SUFFIX.len()]
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({:?})", self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode a query id into its storage key.
///
/// Pure and total: accepts any string, including ones a [`QueryId`] would
/// reject, and never fails.
///
/// # Examples
///
/// ```
/// use pq_types::encode_query_id;
///
/// assert_eq!(encode_query_id("a/b+c").as_str(), "a-b_c.graphql");
/// assert_eq!(encode_query_id("a=b").as_str(), "a.graphql");
/// ```
///
/// [`QueryId`]: crate::QueryId
pub fn encode_query_id(query_id: &str) -> StorageKey {
    let mut encoded = String::with_capacity(query_id.len() + STORAGE_KEY_SUFFIX.len());
    for ch in query_id.chars() {
        match ch {
            '/' => encoded.push('-'),
            '+' => encoded.push('_'),
            '=' => break,
            other => encoded.push(other),
        }
    }
    encoded.push_str(STORAGE_KEY_SUFFIX);
    StorageKey(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn substitutes_base64_characters() {
        assert_eq!(encode_query_id("a/b+c").as_str(), "a-b_c.graphql");
    }

    #[test]
    fn truncates_at_first_equals() {
        assert_eq!(encode_query_id("a=b").as_str(), "a.graphql");
        assert_eq!(encode_query_id("abc==").as_str(), "abc.graphql");
        assert_eq!(encode_query_id("a=b/c+d").as_str(), "a.graphql");
    }

    #[test]
    fn leading_equals_leaves_only_suffix() {
        assert_eq!(encode_query_id("=abc").as_str(), ".graphql");
    }

    #[test]
    fn empty_input_is_accepted() {
        assert_eq!(encode_query_id("").as_str(), ".graphql");
    }

    #[test]
    fn realistic_sha256_base64() {
        let id = "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";
        assert_eq!(
            encode_query_id(id).as_str(),
            "47DEQpj8HBSa_-TImW_5JCeuQeRkm5NMpJWZG3hSuFU.graphql"
        );
    }

    #[test]
    fn non_ascii_is_copied() {
        assert_eq!(encode_query_id("запрос/1").as_str(), "запрос-1.graphql");
    }

    #[test]
    fn stem_strips_suffix() {
        assert_eq!(encode_query_id("a/b").stem(), "a-b");
        assert_eq!(encode_query_id("").stem(), "");
    }

    proptest! {
        #[test]
        fn plain_ids_only_gain_suffix(s in "[^/+=]*") {
            prop_assert_eq!(encode_query_id(&s).into_inner(), format!("{s}{STORAGE_KEY_SUFFIX}"));
        }

        #[test]
        fn stem_never_holds_slash_or_plus(s in any::<String>()) {
            let key = encode_query_id(&s);
            prop_assert!(key.as_str().ends_with(STORAGE_KEY_SUFFIX));
            prop_assert!(!key.stem().contains('/'));
            prop_assert!(!key.stem().contains('+'));
            prop_assert!(!key.stem().contains('='));
        }

        #[test]
        fn length_is_bounded(s in any::<String>()) {
            let key = encode_query_id(&s);
            prop_assert!(key.as_str().chars().count() <= s.chars().count() + STORAGE_KEY_SUFFIX.len());
        }

        #[test]
        fn deterministic(s in any::<String>()) {
            prop_assert_eq!(encode_query_id(&s), encode_query_id(&s));
        }

        #[test]
        fn tail_after_equals_is_ignored(head in "[^=]*", a in any::<String>(), b in any::<String>()) {
            prop_assert_eq!(
                encode_query_id(&format!("{head}={a}")),
                encode_query_id(&format!("{head}={b}"))
            );
        }
    }
}
