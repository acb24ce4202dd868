//! Order-preserving term matching tolerant of bounded token skips.
//!
//! Clinical prose interleaves term words with qualifiers and list
//! separators: "blood, urine, sputum cultures" still mentions a blood
//! culture and a urine culture. Starting from the anchor token, the matcher
//! walks backward through the words the term requires before its anchor and
//! forward through the words after it, skipping intervening tokens while two
//! budgets hold out: a cap on consecutive skips and a cap on total skips per
//! direction.
//!
//! The two directions carry independent budgets. A term's qualifying head
//! and descriptive tail have different tolerance needs; sharing one budget
//! would let a noisy side starve the other. On the backward side a comma is
//! exempt from the consecutive counter (word lists ride on commas) but still
//! pays into the total.
//!
//! Skipped tokens become the gap spans of a [`MultiTextSpan`]; a skip-free
//! resolution collapses to a plain contiguous hit.

use umls_types::{LookupSpan, MultiTextSpan, RareWordTerm, TextSpan};

use crate::matcher::{HitMap, TermMatcher, anchor_candidates};
use crate::window::LookupWindow;

use umls_dict::RareWordDictionary;

pub const DEFAULT_CONSECUTIVE_SKIP_MAX: usize = 2;
pub const DEFAULT_TOTAL_SKIP_MAX: usize = 4;

/// The skip-tolerant matcher.
#[derive(Clone, Copy, Debug)]
pub struct OverlapMatcher {
    consecutive_skip_max: usize,
    total_skip_max: usize,
}

impl Default for OverlapMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CONSECUTIVE_SKIP_MAX, DEFAULT_TOTAL_SKIP_MAX)
    }
}

impl OverlapMatcher {
    pub fn new(consecutive_skip_max: usize, total_skip_max: usize) -> Self {
        Self {
            consecutive_skip_max,
            total_skip_max,
        }
    }

    /// Resolve one candidate term around its anchor, or `None` when a skip
    /// budget runs out or a required word never appears.
    fn resolve(
        &self,
        term: &RareWordTerm,
        window: &LookupWindow,
        anchor: usize,
    ) -> Option<LookupSpan> {
        let words: Vec<&str> = term.words().collect();
        let mut gaps: Vec<TextSpan> = Vec::new();

        let start = self.scan_backward(&words[..term.anchor_index], window, anchor, &mut gaps)?;
        let end = self.scan_forward(&words[term.anchor_index + 1..], window, anchor, &mut gaps)?;

        let span = TextSpan::new(
            window.tokens[start].span.begin,
            window.tokens[end].span.end,
        );
        if gaps.is_empty() {
            Some(span.into())
        } else {
            Some(MultiTextSpan::new(span, gaps).into())
        }
    }

    /// Walk left from the anchor matching `required` (the words before the
    /// anchor, in term order) from last to first. Returns the index of the
    /// leftmost matched token.
    fn scan_backward(
        &self,
        required: &[&str],
        window: &LookupWindow,
        anchor: usize,
        gaps: &mut Vec<TextSpan>,
    ) -> Option<usize> {
        let mut pending = required.len();
        let mut start = anchor;
        let mut consecutive = 0usize;
        let mut total = 0usize;
        let mut index = anchor;

        while pending > 0 {
            if index == 0 {
                return None;
            }
            index -= 1;
            let token = &window.tokens[index];
            if token.matches(required[pending - 1]) {
                pending -= 1;
                consecutive = 0;
                start = index;
            } else {
                // Commas separate listed words; they pay into the total
                // budget only.
                if token.text != "," {
                    consecutive += 1;
                }
                total += 1;
                if consecutive > self.consecutive_skip_max || total > self.total_skip_max {
                    return None;
                }
                gaps.push(token.span);
            }
        }

        Some(start)
    }

    /// Walk right from the anchor matching `required` (the words after the
    /// anchor, in term order). Budgets are independent of the backward scan,
    /// and commas are not exempt here. Returns the index of the rightmost
    /// matched token.
    fn scan_forward(
        &self,
        required: &[&str],
        window: &LookupWindow,
        anchor: usize,
        gaps: &mut Vec<TextSpan>,
    ) -> Option<usize> {
        let mut matched = 0usize;
        let mut end = anchor;
        let mut consecutive = 0usize;
        let mut total = 0usize;
        let mut index = anchor;

        while matched < required.len() {
            index += 1;
            if index >= window.tokens.len() {
                return None;
            }
            let token = &window.tokens[index];
            if token.matches(required[matched]) {
                matched += 1;
                consecutive = 0;
                end = index;
            } else {
                consecutive += 1;
                total += 1;
                if consecutive > self.consecutive_skip_max || total > self.total_skip_max {
                    return None;
                }
                gaps.push(token.span);
            }
        }

        Some(end)
    }
}

impl TermMatcher for OverlapMatcher {
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
                if let Some(span) = self.resolve(term, window, anchor) {
                    hits.insert(span, term.cui);
                }
            }
        }

        hits
    }
}
