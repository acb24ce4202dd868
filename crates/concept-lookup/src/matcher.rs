//! The matcher seam: one capability, a closed set of strategies.

use umls_types::{Cui, LookupSpan, LookupToken, RareWordTerm};

use crate::collections::SpanMultimap;
use crate::exact::ExactMatcher;
use crate::overlap::OverlapMatcher;
use crate::window::LookupWindow;

use umls_dict::RareWordDictionary;

/// Matcher output for one dictionary over one window: every matched span and
/// the set of term identifiers found there.
pub type HitMap = SpanMultimap<LookupSpan, Cui>;

/// A term-matching strategy over one window.
pub trait TermMatcher {
    /// Find every dictionary term occurring in the window. Lookup misses and
    /// failed verifications are silent; an unmatchable window yields an
    /// empty map.
    fn find_terms(&self, dictionary: &RareWordDictionary, window: &LookupWindow) -> HitMap;
}

/// Configuration selector for the shipped strategies.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatcherKind {
    /// Contiguous-sequence matching with per-token variant fallback.
    #[default]
    Exact,
    /// Order-preserving matching tolerant of bounded token skips.
    Overlap,
}

/// The closed set of strategies, selected by [`MatcherKind`].
#[derive(Clone, Debug)]
pub enum MatcherStrategy {
    Exact(ExactMatcher),
    Overlap(OverlapMatcher),
}

impl TermMatcher for MatcherStrategy {
    fn find_terms(&self, dictionary: &RareWordDictionary, window: &LookupWindow) -> HitMap {
        match self {
            MatcherStrategy::Exact(matcher) => matcher.find_terms(dictionary, window),
            MatcherStrategy::Overlap(matcher) => matcher.find_terms(dictionary, window),
        }
    }
}

/// Candidate terms for an anchor token: the dictionary entries under its
/// primary text plus, as a fallback, those under its variant form. The
/// variant applies to the anchor exactly as it does to any other position.
pub(crate) fn anchor_candidates<'d>(
    dictionary: &'d RareWordDictionary,
    token: &LookupToken,
) -> impl Iterator<Item = &'d RareWordTerm> {
    let primary = dictionary.terms_for(&token.text);
    let fallback: &[RareWordTerm] = match token.variant.as_deref() {
        Some(variant) if variant != token.text => dictionary.terms_for(variant),
        _ => &[],
    };
    primary.iter().chain(fallback.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use umls_types::TextSpan;

    #[test]
    fn anchor_candidates_union_text_and_variant() {
        let dict = RareWordDictionary::builder("test", umls_types::SemanticGroup::Unknown)
            .term("blood culture", 1, Cui::new(200))
            .term("blood cultures", 1, Cui::new(201))
            .build();

        let token = LookupToken::with_variant("cultures", "culture", TextSpan::new(0, 8));
        let candidates: Vec<_> = anchor_candidates(&dict, &token).collect();
        assert_eq!(candidates.len(), 2);

        let plain = LookupToken::new("culture", TextSpan::new(0, 7));
        assert_eq!(anchor_candidates(&dict, &plain).count(), 1);
    }

    #[test]
    fn identical_variant_is_not_consulted_twice() {
        let dict = RareWordDictionary::builder("test", umls_types::SemanticGroup::Unknown)
            .term("culture", 0, Cui::new(1))
            .build();
        let token = LookupToken::with_variant("culture", "culture", TextSpan::new(0, 7));
        assert_eq!(anchor_candidates(&dict, &token).count(), 1);
    }
}
