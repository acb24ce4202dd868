//! Contiguous-sequence term matching.
//!
//! For each anchor token, every dictionary term containing that word is
//! projected onto the window: the anchor's position inside the term fixes
//! where the term would have to start, and the full token sequence is then
//! verified position by position. Each position may satisfy its required word
//! with either the token's primary text or its variant form. Any failure
//! silently discards the candidate; there are no partial hits.

use umls_types::TextSpan;

use crate::matcher::{HitMap, TermMatcher, anchor_candidates};
use crate::window::LookupWindow;

use umls_dict::RareWordDictionary;

/// The contiguous matcher. Stateless; all tolerances live in the overlap
/// strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactMatcher;

impl TermMatcher for ExactMatcher {
    fn find_terms(&self, dictionary: &RareWordDictionary, window: &LookupWindow) -> HitMap {
        let mut hits = HitMap::new();

        for &anchor in &window.anchors {
            let token = &window.tokens[anchor];
            for term in anchor_candidates(dictionary, token) {
                if term.token_count == 1 {
                    if token.matches(&term.text) {
                        hits.insert(token.span.into(), term.cui);
                    }
                    continue;
                }

                // The term must fit inside the window around the anchor.
                let Some(start) = anchor.checked_sub(term.anchor_index) else {
                    continue;
                };
                let end = start + term.token_count - 1;
                if end >= window.tokens.len() {
                    continue;
                }

                let verified = window.tokens[start..=end]
                    .iter()
                    .zip(term.words())
                    .all(|(tok, word)| tok.matches(word));
                if verified {
                    let span = TextSpan::new(
                        window.tokens[start].span.begin,
                        window.tokens[end].span.end,
                    );
                    hits.insert(span.into(), term.cui);
                }
            }
        }

        hits
    }
}
