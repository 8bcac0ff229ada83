//
// Copyright (c) 2024 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//
use std::fmt;

/// A chunk fails to canonize for one of these reasons. `LoneDollarStar`,
/// `SingleStarAfterDoubleStar` and `DoubleStarAfterDoubleStar` are the three
/// *fixable* shapes: [`canonize`] rewrites them in place and still returns
/// `Ok`. The rest are hard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonError {
    EmptyChunk,
    StarsInChunk,
    ContainsSharpOrQMark,
    ContainsUnboundDollar,
}

impl fmt::Display for CanonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CanonError::EmptyChunk => "key expression contains an empty chunk",
            CanonError::StarsInChunk => "'*' must either be a whole chunk or part of '$*'",
            CanonError::ContainsSharpOrQMark => "key expression contains '#' or '?'",
            CanonError::ContainsUnboundDollar => "'$' must always be followed by '*'",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for CanonError {}

/// Collapses consecutive `$*` occurrences within a chunk into a single one
/// (`"$*$*$*hi$*$*$*"` -> `"$*hi$*"`).
fn singleify(chunk: &str) -> String {
    let mut s = chunk.to_string();
    while s.contains("$*$*") {
        s = s.replace("$*$*", "$*");
    }
    s
}

/// Rejects `#`, `?`, unbound `$`, and any `*` that isn't either the whole
/// chunk (`*` or `**`) or immediately preceded by `$`.
fn validate_chunk(chunk: &str) -> Result<(), CanonError> {
    if chunk.is_empty() {
        return Err(CanonError::EmptyChunk);
    }
    if chunk == "*" || chunk == "**" {
        return Ok(());
    }
    let chars: Vec<char> = chunk.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '#' | '?' => return Err(CanonError::ContainsSharpOrQMark),
            '$' => {
                if chars.get(i + 1) != Some(&'*') {
                    return Err(CanonError::ContainsUnboundDollar);
                }
                i += 2;
            }
            '*' => return Err(CanonError::StarsInChunk),
            _ => i += 1,
        }
    }
    Ok(())
}

/// Canonizes a key expression: collapses `$*` runs, rewrites a lone `$*`
/// chunk to `*`, and reorders/merges `*`/`**` pairs (`"**/*"` -> `"*/**"`,
/// `"**/**"` -> `"**"`) so that two key expressions with the same meaning
/// always compare equal as strings.
///
/// Ported from the C reference's chunk-by-chunk rewrite in
/// `protocol/keyexpr/canonize.c`; this version builds a new `Vec` of chunks
/// rather than rewriting a byte buffer in place.
pub fn canonize(expr: &str) -> Result<String, CanonError> {
    let chunks: Vec<String> = expr
        .split('/')
        .map(|c| {
            let c = singleify(c);
            validate_chunk(&c)?;
            Ok(if c == "$*" { "*".to_string() } else { c })
        })
        .collect::<Result<_, CanonError>>()?;

    let mut out: Vec<String> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match chunk.as_str() {
            "**" if out.last().map(String::as_str) == Some("**") => {
                // "**/**" collapses to "**"
            }
            "*" if out.last().map(String::as_str) == Some("**") => {
                // "**/*" reorders to "*/**"
                out.pop();
                out.push("*".to_string());
                out.push("**".to_string());
            }
            other => out.push(other.to_string()),
        }
    }
    Ok(out.join("/"))
}

/// True if `expr` is already in its canonical form.
pub fn is_canon(expr: &str) -> bool {
    matches!(canonize(expr), Ok(ref c) if c == expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn assert_canon(input: &str, expected: &str) {
        assert_eq!(canonize(input).as_deref(), Ok(expected));
    }

    #[test]
    fn already_canon_is_unchanged() {
        assert_canon("greetings/hello/there", "greetings/hello/there");
        assert_canon("greetings/good/*/morning", "greetings/good/*/morning");
        assert_canon("greetings/*", "greetings/*");
        assert_canon("greetings/*/**", "greetings/*/**");
    }

    #[test]
    fn lone_dollar_star_chunk() {
        assert_canon("greetings/$*", "greetings/*");
        assert_canon("$*", "*");
        assert_canon("$*$*", "*");
        assert_canon("$*$*$*", "*");
    }

    #[test]
    fn star_after_double_star_reorders() {
        assert_canon("greetings/**/*/morning", "greetings/*/**/morning");
        assert_canon("greetings/**/*", "greetings/*/**");
    }

    #[test]
    fn double_star_after_double_star_collapses() {
        assert_canon("greetings/**/**", "greetings/**");
        assert_canon("greetings/**/*/**", "greetings/*/**");
    }

    #[test]
    fn dollar_star_substrings_collapse_within_chunk() {
        assert_canon("$*hi$*$*", "$*hi$*");
        assert_canon("$*$*hi$*", "$*hi$*");
        assert_canon("hi$*$*$*", "hi$*");
        assert_canon("$*$*$*hi", "$*hi");
        assert_canon("$*$*$*hi$*$*$*", "$*hi$*");
    }

    #[test]
    fn rejects_invalid_chunks() {
        assert_eq!(canonize("a/b//c"), Err(CanonError::EmptyChunk));
        assert_eq!(canonize("a/b#"), Err(CanonError::ContainsSharpOrQMark));
        assert_eq!(canonize("a/b?"), Err(CanonError::ContainsSharpOrQMark));
        assert_eq!(canonize("a/$b"), Err(CanonError::ContainsUnboundDollar));
        assert_eq!(canonize("a/x*y"), Err(CanonError::StarsInChunk));
    }
}
