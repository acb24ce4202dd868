//! Shared types for rare-word terminology lookup over tokenized clinical text.
//!
//! Everything here is a plain value type: half-open [`TextSpan`] intervals and
//! their gapped counterpart [`MultiTextSpan`], the [`LookupToken`] view of one
//! input token, [`RareWordTerm`] dictionary entries, the [`Cui`] identifier
//! codec, UMLS [`SemanticGroup`] classification, and resolved [`Concept`]
//! records. Matchers, loaders, and resolvers live in the `umls-dict` and
//! `concept-lookup` crates; this crate stays dependency-free so every layer
//! can share the same vocabulary.
//!
//! Constructors assert their documented invariants (`begin < end`, anchor
//! index inside the term). A violated invariant is a bug in the upstream
//! tokenizer or dictionary build, not a runtime condition to tolerate.
//!
//! # Example
//! ```rust
//! use umls_types::{Cui, TextSpan};
//!
//! let cui = Cui::parse("C0006142").unwrap();
//! assert_eq!(cui.to_string(), "C0006142");
//!
//! let a = TextSpan::new(0, 13);
//! let b = TextSpan::new(7, 13);
//! assert!(a.contains(&b) && a.overlaps(&b));
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Half-open character interval `[begin, end)` within one text window.
///
/// Ordering is lexicographic by `(begin, end)` so span collections iterate in
/// text order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextSpan {
    pub begin: usize,
    pub end: usize,
}

impl TextSpan {
    /// Build a span, asserting `begin < end`.
    pub fn new(begin: usize, end: usize) -> Self {
        assert!(begin < end, "text span requires begin < end, got [{begin}, {end})");
        Self { begin, end }
    }

    /// Number of characters covered, ignoring interior gaps.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// True when the two intervals share at least one position.
    pub fn overlaps(&self, other: &TextSpan) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// True when `other` lies entirely within `self` (equality included).
    pub fn contains(&self, other: &TextSpan) -> bool {
        self.begin <= other.begin && self.end >= other.end
    }

    /// True when `self` contains `other` and the two are not equal.
    pub fn strictly_contains(&self, other: &TextSpan) -> bool {
        self.contains(other) && self != other
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.begin, self.end)
    }
}

/// A matched span with interior gaps skipped by the overlap matcher.
///
/// Two values are equal iff their outer spans and gap lists are equal. Gaps
/// are kept sorted in text order; the constructor asserts each gap lies
/// strictly inside the outer span.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiTextSpan {
    span: TextSpan,
    gaps: Vec<TextSpan>,
}

impl MultiTextSpan {
    pub fn new(span: TextSpan, mut gaps: Vec<TextSpan>) -> Self {
        assert!(!gaps.is_empty(), "multi-span requires at least one gap");
        gaps.sort();
        gaps.dedup();
        for gap in &gaps {
            assert!(
                span.begin < gap.begin && gap.end < span.end,
                "gap {gap} must lie strictly inside {span}"
            );
        }
        Self { span, gaps }
    }

    pub fn span(&self) -> TextSpan {
        self.span
    }

    pub fn gaps(&self) -> &[TextSpan] {
        &self.gaps
    }

    /// Characters covered once the gaps are subtracted.
    pub fn covered_len(&self) -> usize {
        self.span.len() - self.gaps.iter().map(TextSpan::len).sum::<usize>()
    }
}

impl fmt::Display for MultiTextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{{", self.span)?;
        for (i, gap) in self.gaps.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{gap}")?;
        }
        write!(f, "}}")
    }
}

/// Key type for matcher hits: a contiguous span or a gapped one.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LookupSpan {
    Contiguous(TextSpan),
    Gapped(MultiTextSpan),
}

impl LookupSpan {
    /// The outer interval, gaps ignored.
    pub fn text_span(&self) -> TextSpan {
        match self {
            LookupSpan::Contiguous(span) => *span,
            LookupSpan::Gapped(multi) => multi.span(),
        }
    }

    pub fn begin(&self) -> usize {
        self.text_span().begin
    }

    pub fn end(&self) -> usize {
        self.text_span().end
    }

    pub fn gaps(&self) -> &[TextSpan] {
        match self {
            LookupSpan::Contiguous(_) => &[],
            LookupSpan::Gapped(multi) => multi.gaps(),
        }
    }
}

impl Ord for LookupSpan {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text_span()
            .cmp(&other.text_span())
            .then_with(|| self.gaps().cmp(other.gaps()))
    }
}

impl PartialOrd for LookupSpan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LookupSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupSpan::Contiguous(span) => span.fmt(f),
            LookupSpan::Gapped(multi) => multi.fmt(f),
        }
    }
}

impl From<TextSpan> for LookupSpan {
    fn from(span: TextSpan) -> Self {
        LookupSpan::Contiguous(span)
    }
}

impl From<MultiTextSpan> for LookupSpan {
    fn from(multi: MultiTextSpan) -> Self {
        LookupSpan::Gapped(multi)
    }
}

/// Normalized view of one input token: lowercased surface text, an optional
/// alternate lexical form, and the covered span.
///
/// The variant is typically a singular/plural or otherwise canonicalized form
/// produced upstream; matchers consult it only when the primary text fails.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LookupToken {
    pub text: String,
    pub variant: Option<String>,
    pub span: TextSpan,
}

impl LookupToken {
    pub fn new(text: impl Into<String>, span: TextSpan) -> Self {
        Self {
            text: text.into(),
            variant: None,
            span,
        }
    }

    pub fn with_variant(text: impl Into<String>, variant: impl Into<String>, span: TextSpan) -> Self {
        Self {
            text: text.into(),
            variant: Some(variant.into()),
            span,
        }
    }

    /// True when `word` equals the primary text or the variant form.
    pub fn matches(&self, word: &str) -> bool {
        self.text == word || self.variant.as_deref() == Some(word)
    }
}

/// Packed numeric form of a UMLS concept identifier.
///
/// `C0004096` parses to `Cui(4096)`; formatting restores the `C` prefix and
/// zero-pads to the canonical seven digits (wider identifiers keep their full
/// width). The codec is a plain value, never shared mutable state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Cui(i64);

impl Cui {
    pub fn new(code: i64) -> Self {
        Self(code)
    }

    /// Parse the textual `C`-prefixed form; `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text.strip_prefix(['C', 'c'])?;
        if digits.is_empty() {
            return None;
        }
        digits.parse::<i64>().ok().map(Self)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for Cui {
    fn from(code: i64) -> Self {
        Self(code)
    }
}

impl fmt::Display for Cui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{:07}", self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Cui {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Cui {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Cui::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid CUI: {text}")))
    }
}

/// One dictionary entry: a space-joined lowercase term indexed by the rare
/// word at `anchor_index`.
///
/// Many terms may share an anchor word, and many surface forms may share a
/// CUI.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RareWordTerm {
    pub text: String,
    pub token_count: usize,
    pub anchor_index: usize,
    pub cui: Cui,
}

impl RareWordTerm {
    /// Build a term, asserting the anchor index addresses one of the term's
    /// words and the stored token count matches the text.
    pub fn new(text: impl Into<String>, token_count: usize, anchor_index: usize, cui: Cui) -> Self {
        let text = text.into();
        assert!(token_count >= 1, "term {text:?} requires at least one token");
        assert!(
            anchor_index < token_count,
            "anchor index {anchor_index} out of range for {token_count}-token term {text:?}"
        );
        assert_eq!(
            text.split_whitespace().count(),
            token_count,
            "token count does not match term text {text:?}"
        );
        Self {
            text,
            token_count,
            anchor_index,
            cui,
        }
    }

    /// The term's words in order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }

    /// The word the term is indexed under.
    pub fn anchor_word(&self) -> &str {
        self.words()
            .nth(self.anchor_index)
            .expect("anchor index verified at construction")
    }
}

/// Coarse UMLS semantic grouping used to reconcile competing hits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SemanticGroup {
    AnatomicalSite,
    Disorder,
    Finding,
    Drug,
    Procedure,
    Unknown,
}

impl SemanticGroup {
    /// Classify a UMLS semantic type (TUI) into its coarse group.
    pub fn from_tui(tui: &str) -> Self {
        match tui {
            "T021" | "T022" | "T023" | "T024" | "T025" | "T026" | "T029" | "T030" => {
                SemanticGroup::AnatomicalSite
            }
            "T019" | "T020" | "T037" | "T047" | "T048" | "T049" | "T050" | "T190" | "T191" => {
                SemanticGroup::Disorder
            }
            "T033" | "T034" | "T040" | "T041" | "T042" | "T043" | "T044" | "T045" | "T046"
            | "T056" | "T057" | "T184" => SemanticGroup::Finding,
            "T109" | "T110" | "T114" | "T115" | "T116" | "T118" | "T119" | "T121" | "T122"
            | "T123" | "T124" | "T125" | "T126" | "T127" | "T129" | "T130" | "T131" | "T195"
            | "T196" | "T197" | "T200" | "T203" => SemanticGroup::Drug,
            "T059" | "T060" | "T061" => SemanticGroup::Procedure,
            _ => SemanticGroup::Unknown,
        }
    }

    /// Stable lowercase code used in logs and serialized annotations.
    pub fn code(&self) -> &'static str {
        match self {
            SemanticGroup::AnatomicalSite => "anatomy",
            SemanticGroup::Disorder => "disorder",
            SemanticGroup::Finding => "finding",
            SemanticGroup::Drug => "drug",
            SemanticGroup::Procedure => "procedure",
            SemanticGroup::Unknown => "unknown",
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "anatomy" => Some(SemanticGroup::AnatomicalSite),
            "disorder" => Some(SemanticGroup::Disorder),
            "finding" => Some(SemanticGroup::Finding),
            "drug" => Some(SemanticGroup::Drug),
            "procedure" => Some(SemanticGroup::Procedure),
            "unknown" => Some(SemanticGroup::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Resolved concept record: preferred text, semantic types, and per-vocabulary
/// codes.
///
/// Built lazily by a concept resolver; a CUI with no backing data degrades to
/// [`identifier_only`](Self::identifier_only).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Concept {
    pub cui: Cui,
    pub preferred_text: Option<String>,
    pub tuis: BTreeSet<String>,
    pub codes: BTreeMap<String, BTreeSet<String>>,
}

impl Concept {
    pub fn new(cui: Cui, preferred_text: impl Into<String>) -> Self {
        Self {
            cui,
            preferred_text: Some(preferred_text.into()),
            tuis: BTreeSet::new(),
            codes: BTreeMap::new(),
        }
    }

    /// Degraded record carrying only the raw identifier.
    pub fn identifier_only(cui: Cui) -> Self {
        Self {
            cui,
            preferred_text: None,
            tuis: BTreeSet::new(),
            codes: BTreeMap::new(),
        }
    }

    pub fn with_tui(mut self, tui: impl Into<String>) -> Self {
        self.tuis.insert(tui.into());
        self
    }

    pub fn with_code(mut self, vocabulary: impl Into<String>, code: impl Into<String>) -> Self {
        self.codes
            .entry(vocabulary.into())
            .or_default()
            .insert(code.into());
        self
    }

    /// Coarse groups derived from the concept's semantic types.
    pub fn groups(&self) -> BTreeSet<SemanticGroup> {
        self.tuis
            .iter()
            .map(|tui| SemanticGroup::from_tui(tui))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_overlap_is_symmetric() {
        let a = TextSpan::new(0, 6);
        let b = TextSpan::new(4, 10);
        let c = TextSpan::new(6, 12);
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!a.overlaps(&c), "half-open spans touching at 6 do not overlap");
    }

    #[test]
    fn span_containment_distinguishes_strict() {
        let outer = TextSpan::new(0, 15);
        let inner = TextSpan::new(0, 10);
        assert!(outer.contains(&inner));
        assert!(outer.strictly_contains(&inner));
        assert!(outer.contains(&outer));
        assert!(!outer.strictly_contains(&outer));
    }

    #[test]
    #[should_panic(expected = "begin < end")]
    fn inverted_span_panics() {
        TextSpan::new(5, 5);
    }

    #[test]
    fn multi_span_sorts_gaps_and_compares_by_content() {
        let outer = TextSpan::new(0, 20);
        let a = MultiTextSpan::new(outer, vec![TextSpan::new(10, 12), TextSpan::new(4, 6)]);
        let b = MultiTextSpan::new(outer, vec![TextSpan::new(4, 6), TextSpan::new(10, 12)]);
        assert_eq!(a, b);
        assert_eq!(a.gaps(), &[TextSpan::new(4, 6), TextSpan::new(10, 12)]);
        assert_eq!(a.covered_len(), 16);
    }

    #[test]
    #[should_panic(expected = "strictly inside")]
    fn gap_touching_outer_edge_panics() {
        MultiTextSpan::new(TextSpan::new(0, 10), vec![TextSpan::new(0, 2)]);
    }

    #[test]
    fn lookup_span_orders_by_outer_then_gaps() {
        let plain = LookupSpan::from(TextSpan::new(0, 10));
        let gapped =
            LookupSpan::from(MultiTextSpan::new(TextSpan::new(0, 10), vec![TextSpan::new(3, 5)]));
        assert!(plain < gapped);
        assert_ne!(plain, gapped);
    }

    #[test]
    fn cui_codec_round_trips() {
        let cui = Cui::parse("C0004096").unwrap();
        assert_eq!(cui.as_i64(), 4096);
        assert_eq!(cui.to_string(), "C0004096");
        assert_eq!(Cui::parse("c1234567"), Some(Cui::new(1_234_567)));
        assert_eq!(Cui::parse("0004096"), None);
        assert_eq!(Cui::parse("C"), None);
        assert_eq!(Cui::parse("Cabc"), None);
    }

    #[test]
    fn token_variant_is_a_fallback_form() {
        let token = LookupToken::with_variant("cultures", "culture", TextSpan::new(0, 8));
        assert!(token.matches("cultures"));
        assert!(token.matches("culture"));
        assert!(!token.matches("cult"));
    }

    #[test]
    fn term_exposes_anchor_word() {
        let term = RareWordTerm::new("breast cancer", 2, 1, Cui::new(100));
        assert_eq!(term.anchor_word(), "cancer");
        assert_eq!(term.words().collect::<Vec<_>>(), vec!["breast", "cancer"]);
    }

    #[test]
    #[should_panic(expected = "anchor index")]
    fn anchor_outside_term_panics() {
        RareWordTerm::new("breast cancer", 2, 2, Cui::new(100));
    }

    #[test]
    fn tui_classification_covers_the_major_groups() {
        assert_eq!(SemanticGroup::from_tui("T023"), SemanticGroup::AnatomicalSite);
        assert_eq!(SemanticGroup::from_tui("T047"), SemanticGroup::Disorder);
        assert_eq!(SemanticGroup::from_tui("T184"), SemanticGroup::Finding);
        assert_eq!(SemanticGroup::from_tui("T121"), SemanticGroup::Drug);
        assert_eq!(SemanticGroup::from_tui("T061"), SemanticGroup::Procedure);
        assert_eq!(SemanticGroup::from_tui("T999"), SemanticGroup::Unknown);
    }

    #[test]
    fn concept_groups_derive_from_tuis() {
        let concept = Concept::new(Cui::new(100), "Breast cancer")
            .with_tui("T191")
            .with_code("SNOMEDCT_US", "254837009");
        assert_eq!(
            concept.groups().into_iter().collect::<Vec<_>>(),
            vec![SemanticGroup::Disorder]
        );
        let bare = Concept::identifier_only(Cui::new(7));
        assert!(bare.preferred_text.is_none());
        assert!(bare.groups().is_empty());
    }
}
