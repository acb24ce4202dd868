//! Reconcile competing hits across and within semantic groups.
//!
//! Matching runs once per dictionary, so the same stretch of text can come
//! back as an anatomical site, a finding, and a disorder at once. This pass
//! applies a fixed rule order to leave each span with its most specific,
//! non-contradictory reading:
//!
//! 1. an anatomical-site span deletes identical finding and disorder spans;
//! 2. a disorder span deletes an identical finding span, then any finding
//!    wholly inside a disorder span;
//! 3. every remaining group keeps only its most specific spans: a span
//!    strictly containing another deletes the inner one.
//!
//! True overlaps without containment are kept on both sides; disambiguating
//! those is out of scope here. Drug and procedure hits never contest
//! finding or disorder spans: the rule set deliberately leaves that
//! combination untouched.
//!
//! Candidate spans are collected in sorted order before any comparison, so
//! the result never depends on map iteration order, and running the pass on
//! its own output changes nothing.

use std::collections::BTreeMap;

use umls_types::{Cui, SemanticGroup, TextSpan};

use crate::collections::SpanMultimap;

/// Surviving hits for one semantic group, keyed by outer span.
pub type GroupHits = SpanMultimap<TextSpan, Cui>;

/// Hits for one window, grouped by semantic group.
pub type SemanticGroupHits = BTreeMap<SemanticGroup, GroupHits>;

/// Apply the full rule order once. Idempotent.
pub fn resolve_conflicts(groups: &mut SemanticGroupHits) {
    suppress_anatomy_shadows(groups);
    prefer_disorders_over_findings(groups);
    for hits in groups.values_mut() {
        trim_to_most_specific(hits);
    }
    groups.retain(|_, hits| !hits.is_empty());
}

/// Rule 1: an anatomical mention is not simultaneously a symptom or a
/// disease at the exact same location.
fn suppress_anatomy_shadows(groups: &mut SemanticGroupHits) {
    let Some(sites) = groups.get(&SemanticGroup::AnatomicalSite) else {
        return;
    };
    let site_spans: Vec<TextSpan> = sites.keys().copied().collect();

    for group in [SemanticGroup::Finding, SemanticGroup::Disorder] {
        if let Some(hits) = groups.get_mut(&group) {
            for span in &site_spans {
                hits.remove(span);
            }
        }
    }
}

/// Rule 2: a disorder reading is more specific than a finding reading at the
/// same location, and a finding wholly inside a disorder mention is part of
/// that mention.
fn prefer_disorders_over_findings(groups: &mut SemanticGroupHits) {
    let Some(disorders) = groups.get(&SemanticGroup::Disorder) else {
        return;
    };
    let disorder_spans: Vec<TextSpan> = disorders.keys().copied().collect();
    let Some(findings) = groups.get_mut(&SemanticGroup::Finding) else {
        return;
    };

    for span in &disorder_spans {
        findings.remove(span);
    }
    let contained: Vec<TextSpan> = findings
        .keys()
        .filter(|finding| disorder_spans.iter().any(|d| d.contains(finding)))
        .copied()
        .collect();
    for span in &contained {
        findings.remove(span);
    }
}

/// Rule 3: within one group, a span strictly containing another deletes the
/// inner one. Overlap without containment keeps both.
fn trim_to_most_specific(hits: &mut GroupHits) {
    let spans: Vec<TextSpan> = hits.keys().copied().collect();
    for inner in &spans {
        if spans.iter().any(|outer| outer.strictly_contains(inner)) {
            hits.remove(inner);
        }
    }
}
