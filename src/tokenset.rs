// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bracket-token set encoding.
//!
//! Multi-valued membership fields (workspaces, dimension hashes, the type
//! closure, ancestor path prefixes) are stored inside a single text column as
//! `#`-wrapped tokens joined with `", "`:
//!
//! ```text
//! #live#, #user-admin#
//! ```
//!
//! Membership is tested with `LIKE '%#token#%'` instead of a join table. All
//! encoding and pattern construction goes through this module so the format
//! is defined in exactly one place.

/// Wrap a single value as a token: `live` → `#live#`.
pub fn token(value: &str) -> String {
    format!("#{}#", value)
}

/// Encode a set of values as a token-set string.
///
/// An empty iterator encodes to the empty string.
pub fn encode<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| token(v.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Union-append a value onto an already-encoded set.
///
/// Appends unconditionally; the sets are append-only unions within one
/// indexing pass and duplicates do not change membership semantics.
pub fn append(encoded: &str, value: &str) -> String {
    if encoded.is_empty() {
        token(value)
    } else {
        format!("{}, {}", encoded, token(value))
    }
}

/// `LIKE` pattern matching rows whose set contains `value`.
pub fn like_pattern(value: &str) -> String {
    format!("%{}%", token(value))
}

/// Check an encoded set for membership without going through SQL.
pub fn contains(encoded: &str, value: &str) -> bool {
    encoded.contains(&token(value))
}
