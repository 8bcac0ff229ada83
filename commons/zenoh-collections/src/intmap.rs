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
use std::collections::HashMap;

/// A map keyed by small, densely-allocated integers (resource ids, entity
/// ids, query ids). A `HashMap<usize, V>` underneath today; kept as its own
/// type so the allocation strategy (a `Vec<Option<V>>` slab) can be swapped
/// in later without touching call sites across the session layer.
#[derive(Debug, Clone, Default)]
pub struct IntMap<V> {
    inner: HashMap<usize, V>,
}

impl<V> IntMap<V> {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn get(&self, id: usize) -> Option<&V> {
        self.inner.get(&id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut V> {
        self.inner.get_mut(&id)
    }

    pub fn insert(&mut self, id: usize, value: V) -> Option<V> {
        self.inner.insert(id, value)
    }

    pub fn remove(&mut self, id: usize) -> Option<V> {
        self.inner.remove(&id)
    }

    pub fn contains(&self, id: usize) -> bool {
        self.inner.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &V)> {
        self.inner.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (usize, V)> + '_ {
        self.inner.drain()
    }
}
