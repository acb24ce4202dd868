//! Turn resolved hits into output annotation records.
//!
//! Pure translation: no further matching or conflict logic happens here. A
//! CUI with no resolvable concept data still yields a record, carrying the
//! identifier alone.

use std::collections::BTreeSet;

use serde::Serialize;
use umls_types::{Concept, Cui, SemanticGroup};

use crate::cleanup::SemanticGroupHits;
use crate::resolver::ConceptResolver;

/// One recognized mention: the semantic group, the covered offsets, and the
/// deduplicated concept records behind it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Annotation {
    pub group: SemanticGroup,
    pub begin: usize,
    pub end: usize,
    pub concepts: Vec<Concept>,
}

/// Assemble annotations for every surviving hit, ordered by
/// `(group, begin, end)`.
///
/// Concepts are deduplicated by `(cui, semantic types)`; duplicate surface
/// forms of one concept collapse to a single record per span.
pub fn assemble_annotations(
    groups: &SemanticGroupHits,
    resolver: &impl ConceptResolver,
) -> Vec<Annotation> {
    let mut annotations = Vec::new();

    for (group, hits) in groups {
        for (span, cuis) in hits.iter() {
            let mut seen: BTreeSet<(Cui, Vec<String>)> = BTreeSet::new();
            let mut concepts = Vec::new();
            for &cui in cuis {
                let resolved = resolver.concepts_for(cui);
                let resolved = if resolved.is_empty() {
                    vec![Concept::identifier_only(cui)]
                } else {
                    resolved
                };
                for concept in resolved {
                    let key = (concept.cui, concept.tuis.iter().cloned().collect());
                    if seen.insert(key) {
                        concepts.push(concept);
                    }
                }
            }
            annotations.push(Annotation {
                group: *group,
                begin: span.begin,
                end: span.end,
                concepts,
            });
        }
    }

    annotations
}
