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
//! Key expression canonization and matching: the `/`-separated, `*`/`**`/`$*`
//! wildcard grammar zenoh uses to name and select resources.

mod canon;
mod intersect;

pub use canon::{canonize, is_canon, CanonError};
pub use intersect::{equal, includes, intersect};

use std::fmt;
use std::ops::Deref;

/// An owned, canonized key expression.
///
/// Construction always canonizes, so two `KeyExpr`s built from differently
/// written but semantically identical strings (`"a/$*"` and `"a/*"`) compare
/// equal and intersect consistently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyExpr(String);

impl KeyExpr {
    pub fn new(expr: impl AsRef<str>) -> Result<Self, CanonError> {
        Ok(Self(canonize(expr.as_ref())?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn intersects(&self, other: &KeyExpr) -> bool {
        intersect(&self.0, &other.0)
    }

    pub fn includes(&self, other: &KeyExpr) -> bool {
        includes(&self.0, &other.0)
    }

    /// A key expression containing no `*`, `**` or `$*` names exactly one
    /// resource and can be used as a publication key.
    pub fn is_wild(&self) -> bool {
        self.0.split('/').any(|c| c.contains('*'))
    }
}

impl Deref for KeyExpr {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for KeyExpr {
    type Error = CanonError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        KeyExpr::new(value)
    }
}

impl TryFrom<String> for KeyExpr {
    type Error = CanonError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        KeyExpr::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_canonizes() {
        let a = KeyExpr::new("greetings/$*").unwrap();
        let b = KeyExpr::new("greetings/*").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn is_wild_detects_wildcards() {
        assert!(!KeyExpr::new("a/b/c").unwrap().is_wild());
        assert!(KeyExpr::new("a/*/c").unwrap().is_wild());
    }
}
