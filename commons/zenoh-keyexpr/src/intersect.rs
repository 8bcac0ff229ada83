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
use crate::canonize;

/// A chunk broken into literal characters and `$*` wildcard markers, for the
/// within-chunk glob comparisons `chunk_intersect`/`chunk_includes` need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seg {
    Char(char),
    Star,
}

fn parse_chunk(chunk: &str) -> Vec<Seg> {
    let mut segs = Vec::new();
    let chars: Vec<char> = chunk.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && chars.get(i + 1) == Some(&'*') {
            segs.push(Seg::Star);
            i += 2;
        } else {
            segs.push(Seg::Char(chars[i]));
            i += 1;
        }
    }
    segs
}

/// Do two `$*`-glob patterns share at least one matching string? Standard
/// two-wildcard-pattern intersection: a `Star` on either side may match zero
/// characters (skip it) or absorb one character from the other side (stay
/// in place, advance the other).
fn seg_intersect(a: &[Seg], b: &[Seg]) -> bool {
    match (a.first(), b.first()) {
        (None, None) => true,
        (None, Some(_)) => b.iter().all(|s| *s == Seg::Star),
        (Some(_), None) => a.iter().all(|s| *s == Seg::Star),
        (Some(Seg::Star), _) => seg_intersect(&a[1..], b) || (!b.is_empty() && seg_intersect(a, &b[1..])),
        (_, Some(Seg::Star)) => seg_intersect(a, &b[1..]) || (!a.is_empty() && seg_intersect(&a[1..], b)),
        (Some(Seg::Char(ca)), Some(Seg::Char(cb))) => ca == cb && seg_intersect(&a[1..], &b[1..]),
    }
}

/// Does `pattern`'s glob match the literal string `s` exactly?
fn glob_matches_literal(pattern: &str, s: &str) -> bool {
    let lit: Vec<Seg> = s.chars().map(Seg::Char).collect();
    seg_intersect(&parse_chunk(pattern), &lit)
}

/// Single-chunk intersection: `*` matches any non-empty chunk unconditionally;
/// otherwise the two chunks' `$*` globs are checked for a common match.
fn chunk_intersect(a: &str, b: &str) -> bool {
    if a == "*" || b == "*" {
        return true;
    }
    if a == b {
        return true;
    }
    seg_intersect(&parse_chunk(a), &parse_chunk(b))
}

/// Does `a` (as a glob) include everything `b` (as a glob) could ever match?
/// Exact for the common cases (`*` including any chunk, identical literals,
/// a wildcarded chunk including a concrete one); when both chunks carry
/// their own `$*` wildcards this conservatively falls back to requiring
/// textual equality, rather than risk claiming an inclusion that doesn't
/// hold for every expansion of `b`.
fn chunk_includes(a: &str, b: &str) -> bool {
    if a == "*" || a == b {
        return true;
    }
    if !a.contains("$*") {
        return false;
    }
    if b.contains("$*") {
        return false;
    }
    glob_matches_literal(a, b)
}

fn chunks(expr: &str) -> Vec<&str> {
    expr.split('/').collect()
}

/// True if `left` and `right` key expressions select at least one key in
/// common. This is the relation the session layer runs for every
/// publish/subscribe and query/queryable match (spec §4.3/§4.4): recursive
/// backtracking over `/`-separated chunks, where `**` may consume zero or
/// more chunks on either side.
pub fn intersect(left: &str, right: &str) -> bool {
    fn go(a: &[&str], b: &[&str]) -> bool {
        match (a.first(), b.first()) {
            (None, None) => true,
            (None, Some(_)) => b.iter().all(|c| *c == "**"),
            (Some(_), None) => a.iter().all(|c| *c == "**"),
            (Some(&"**"), _) => go(&a[1..], b) || (!b.is_empty() && go(a, &b[1..])),
            (_, Some(&"**")) => go(a, &b[1..]) || (!a.is_empty() && go(&a[1..], b)),
            (Some(ca), Some(cb)) => chunk_intersect(ca, cb) && go(&a[1..], &b[1..]),
        }
    }
    go(&chunks(left), &chunks(right))
}

/// True if every key matched by `other` is also matched by `which` — i.e.
/// `which` is at least as broad a selection as `other`.
pub fn includes(which: &str, other: &str) -> bool {
    fn go(a: &[&str], b: &[&str]) -> bool {
        match (a.first(), b.first()) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some(_), None) => a.iter().all(|c| *c == "**"),
            (Some(&"**"), Some(&"**")) => go(&a[1..], &b[1..]) || go(a, &b[1..]),
            (Some(&"**"), _) => go(&a[1..], b) || (!b.is_empty() && go(a, &b[1..])),
            (_, Some(&"**")) => false,
            (Some(ca), Some(cb)) => chunk_includes(ca, cb) && go(&a[1..], &b[1..]),
        }
    }
    go(&chunks(which), &chunks(other))
}

/// Two key expressions denote the same selection iff their canonical forms
/// are textually identical.
pub fn equal(a: &str, b: &str) -> bool {
    matches!((canonize(a), canonize(b)), (Ok(ca), Ok(cb)) if ca == cb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_wildcard_intersects_one_chunk() {
        assert!(intersect("greetings/*", "greetings/hello"));
        assert!(!intersect("greetings/*", "greetings/hello/there"));
    }

    #[test]
    fn double_star_spans_zero_or_more_chunks() {
        assert!(intersect("greetings/**", "greetings"));
        assert!(intersect("greetings/**", "greetings/hello/there"));
        assert!(intersect("a/**/b", "a/b"));
        assert!(intersect("a/**/b", "a/x/y/b"));
        assert!(!intersect("a/**/b", "a/x/y/c"));
    }

    #[test]
    fn dollar_star_is_a_substring_glob() {
        assert!(intersect("demo/ex/$*", "demo/ex/hello"));
        assert!(intersect("demo/ex/$*", "demo/ex/"));
        assert!(intersect("demo/ex/a$*z", "demo/ex/abcz"));
        assert!(!intersect("demo/ex/a$*z", "demo/ex/abcy"));
    }

    #[test]
    fn includes_common_cases() {
        assert!(includes("greetings/*", "greetings/hello"));
        assert!(includes("greetings/**", "greetings/hello/there"));
        assert!(!includes("greetings/hello", "greetings/*"));
    }

    #[test]
    fn equal_compares_canonical_forms() {
        assert!(equal("greetings/$*", "greetings/*"));
        assert!(!equal("greetings/*", "greetings/**"));
    }
}
