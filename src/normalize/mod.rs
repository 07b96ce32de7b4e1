//! String normalization
//!
//! Free-text criteria are matched as escaped literals: the string is
//! decomposed (NFD), combining marks are dropped, and regex metacharacters
//! are escaped so the result is safe to hand to the `$regex` operator.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Remove diacritical marks via canonical decomposition
pub fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalized, regex-escaped literal for substring matching
pub fn pattern_literal(input: &str) -> String {
    regex::escape(&strip_diacritics(input))
}
