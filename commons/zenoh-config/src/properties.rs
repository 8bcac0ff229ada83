//
// Copyright (c) 2022 ZettaScale Technology
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
//! The flat string property bag of spec.md §6: every configuration key is a
//! plain string, independent of whether `Config` recognizes it yet. `Config`
//! is built on top of this, not instead of it, so an unrecognized key (a new
//! TLS knob, say) still round-trips through `to_properties`/`from_properties`.

use std::collections::BTreeMap;
use std::fmt;

/// Multi-valued keys (`connect/endpoint`, `listen/endpoint`) join their
/// values with this separator within a single property string.
pub const LIST_SEPARATOR: char = ',';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(s) if !s.is_empty() => s.split(LIST_SEPARATOR).map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    pub fn insert_list(&mut self, key: impl Into<String>, values: &[String]) {
        self.0.insert(key.into(), values.join(&LIST_SEPARATOR.to_string()));
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                write!(f, ";")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_values_round_trip() {
        let mut p = Properties::new();
        p.insert_list("connect/endpoint", &["tcp/10.0.0.1:7447".into(), "tcp/10.0.0.2:7447".into()]);
        assert_eq!(
            p.get_list("connect/endpoint"),
            vec!["tcp/10.0.0.1:7447".to_string(), "tcp/10.0.0.2:7447".to_string()]
        );
    }

    #[test]
    fn missing_key_is_empty_list() {
        let p = Properties::new();
        assert!(p.get_list("listen/endpoint").is_empty());
    }
}
