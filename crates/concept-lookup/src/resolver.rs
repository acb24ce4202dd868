//! Concept resolution as an injected capability.
//!
//! The matcher never talks to a terminology store directly; it receives
//! something implementing [`ConceptResolver`] and treats an empty answer as
//! "identifier only". The trait is deliberately tiny so a JDBC-style table,
//! a flat file, or a test fixture all plug in the same way, and so no
//! process-wide singleton is needed to share a connection or cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use umls_dict::ConceptTable;
use umls_types::{Concept, Cui};

/// Look up the concept records behind a term identifier.
pub trait ConceptResolver {
    /// All concept records for `cui`; empty when the identifier has no
    /// backing data (the caller degrades to an identifier-only concept).
    fn concepts_for(&self, cui: Cui) -> Vec<Concept>;
}

impl<R: ConceptResolver + ?Sized> ConceptResolver for &R {
    fn concepts_for(&self, cui: Cui) -> Vec<Concept> {
        (**self).concepts_for(cui)
    }
}

impl<R: ConceptResolver + ?Sized> ConceptResolver for Arc<R> {
    fn concepts_for(&self, cui: Cui) -> Vec<Concept> {
        (**self).concepts_for(cui)
    }
}

impl ConceptResolver for ConceptTable {
    fn concepts_for(&self, cui: Cui) -> Vec<Concept> {
        self.get(cui).cloned().into_iter().collect()
    }
}

/// Test-friendly resolver over an in-memory map.
impl ConceptResolver for BTreeMap<Cui, Vec<Concept>> {
    fn concepts_for(&self, cui: Cui) -> Vec<Concept> {
        self.get(&cui).cloned().unwrap_or_default()
    }
}

/// Read-through cache over any resolver, safe for concurrent readers.
///
/// Worker threads processing independent windows share one instance behind
/// an `Arc`; the backing resolver is consulted once per distinct CUI.
pub struct CachedResolver<R> {
    inner: R,
    cache: DashMap<Cui, Arc<Vec<Concept>>>,
}

impl<R: ConceptResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Number of distinct CUIs resolved so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<R: ConceptResolver> ConceptResolver for CachedResolver<R> {
    fn concepts_for(&self, cui: Cui) -> Vec<Concept> {
        if let Some(hit) = self.cache.get(&cui) {
            return hit.as_ref().clone();
        }
        let resolved = Arc::new(self.inner.concepts_for(cui));
        self.cache.insert(cui, Arc::clone(&resolved));
        resolved.as_ref().clone()
    }
}
