//! Ordered multimap shared by the matchers and the conflict resolver.
//!
//! One generic structure replaces the assortment of span-keyed collection
//! maps this kind of pipeline tends to grow. Keys iterate in sorted order, so
//! every consumer sees a deterministic sequence regardless of insertion
//! order.

use std::collections::{BTreeMap, BTreeSet};

/// A `BTreeMap<K, BTreeSet<V>>` with multimap insert semantics.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpanMultimap<K: Ord, V: Ord> {
    inner: BTreeMap<K, BTreeSet<V>>,
}

impl<K: Ord, V: Ord> Default for SpanMultimap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V: Ord> SpanMultimap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    /// Add one value under `key`; returns false when the pair was already
    /// present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.inner.entry(key).or_default().insert(value)
    }

    /// Add every value under `key`.
    pub fn insert_all(&mut self, key: K, values: impl IntoIterator<Item = V>) {
        self.inner.entry(key).or_default().extend(values);
    }

    pub fn get(&self, key: &K) -> Option<&BTreeSet<V>> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<BTreeSet<V>> {
        self.inner.remove(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    /// Entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &BTreeSet<V>)> {
        self.inner.iter()
    }

    /// Number of keys (not key/value pairs).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Fold another multimap into this one.
    pub fn merge(&mut self, other: SpanMultimap<K, V>) {
        for (key, values) in other.inner {
            self.inner.entry(key).or_default().extend(values);
        }
    }
}

impl<K: Ord, V: Ord> FromIterator<(K, V)> for SpanMultimap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: Ord, V: Ord> IntoIterator for SpanMultimap<K, V> {
    type Item = (K, BTreeSet<V>);
    type IntoIter = std::collections::btree_map::IntoIter<K, BTreeSet<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
