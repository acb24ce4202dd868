//! End-to-end behavior of the matchers, the conflict resolver, and the
//! engine pipeline.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use concept_lookup::{
    ExactMatcher, LookupConfig, LookupEngine, MatcherKind, OverlapMatcher, RawToken, TermMatcher,
    extract_window,
};
use umls_dict::RareWordDictionary;
use umls_types::{Concept, Cui, LookupSpan, MultiTextSpan, SemanticGroup, TextSpan};

fn no_concepts() -> BTreeMap<Cui, Vec<Concept>> {
    BTreeMap::new()
}

#[test]
fn exact_matcher_finds_a_two_word_term() {
    let dict = RareWordDictionary::builder("disorders", SemanticGroup::Disorder)
        .term("breast cancer", 1, Cui::new(100))
        .build();
    let tokens = vec![RawToken::word("breast", 0), RawToken::word("cancer", 7)];
    let window = extract_window(&tokens, 3, &HashSet::new());

    let hits = ExactMatcher.find_terms(&dict, &window);
    assert_eq!(hits.len(), 1);
    let cuis = hits.get(&LookupSpan::from(TextSpan::new(0, 13))).expect("hit at [0,13)");
    assert_eq!(cuis.iter().copied().collect::<Vec<_>>(), vec![Cui::new(100)]);
}

/// "blood, urine, sputum cultures" yields a gapped hit for each list head.
#[test]
fn overlap_matcher_resolves_comma_separated_cultures() {
    let dict = RareWordDictionary::builder("procedures", SemanticGroup::Procedure)
        .term("blood culture", 1, Cui::new(200))
        .term("urine culture", 1, Cui::new(201))
        .build();
    let tokens = vec![
        RawToken::word("blood", 0),
        RawToken::punct(",", 5),
        RawToken::word("urine", 7),
        RawToken::punct(",", 12),
        RawToken::word("sputum", 14),
        RawToken::word("cultures", 21).with_variant("culture"),
    ];
    let window = extract_window(&tokens, 3, &HashSet::new());
    let hits = OverlapMatcher::new(2, 4).find_terms(&dict, &window);

    let blood = LookupSpan::from(MultiTextSpan::new(
        TextSpan::new(0, 29),
        vec![
            TextSpan::new(5, 6),
            TextSpan::new(7, 12),
            TextSpan::new(12, 13),
            TextSpan::new(14, 20),
        ],
    ));
    let urine = LookupSpan::from(MultiTextSpan::new(
        TextSpan::new(7, 29),
        vec![TextSpan::new(12, 13), TextSpan::new(14, 20)],
    ));
    assert!(hits.get(&blood).expect("blood culture").contains(&Cui::new(200)));
    assert!(hits.get(&urine).expect("urine culture").contains(&Cui::new(201)));
}

/// Matching twice over identical inputs is byte-identical output.
#[test]
fn matchers_are_deterministic() {
    let dict = RareWordDictionary::builder("mixed", SemanticGroup::Unknown)
        .term("congestive heart failure", 2, Cui::new(1))
        .term("heart failure", 1, Cui::new(2))
        .term("heart", 0, Cui::new(3))
        .term("failure", 0, Cui::new(4))
        .build();
    let tokens = vec![
        RawToken::word("congestive", 0),
        RawToken::word("heart", 11),
        RawToken::word("failure", 17),
    ];
    let window = extract_window(&tokens, 3, &HashSet::new());

    let exact_a = ExactMatcher.find_terms(&dict, &window);
    let exact_b = ExactMatcher.find_terms(&dict, &window);
    assert_eq!(exact_a, exact_b);

    let overlap_a = OverlapMatcher::default().find_terms(&dict, &window);
    let overlap_b = OverlapMatcher::default().find_terms(&dict, &window);
    assert_eq!(overlap_a, overlap_b);
}

/// A skip-free overlap matcher degenerates to exact matching.
#[test]
fn overlap_with_zero_budgets_subsumes_exact() {
    let dict = RareWordDictionary::builder("mixed", SemanticGroup::Unknown)
        .term("congestive heart failure", 2, Cui::new(1))
        .term("heart failure", 1, Cui::new(2))
        .term("failure", 0, Cui::new(3))
        .build();
    let tokens = vec![
        RawToken::word("acute", 0),
        RawToken::word("congestive", 6),
        RawToken::word("heart", 17),
        RawToken::word("failure", 23),
        RawToken::punct(".", 30),
    ];
    let window = extract_window(&tokens, 3, &HashSet::new());

    let exact = ExactMatcher.find_terms(&dict, &window);
    let skipless = OverlapMatcher::new(0, 0).find_terms(&dict, &window);
    assert_eq!(exact, skipless);
    assert_eq!(exact.len(), 3);
}

/// A term needing exactly k skips matches at total budget k and not at k-1.
#[test]
fn skip_budget_boundary_is_sharp() {
    let dict = RareWordDictionary::builder("procedures", SemanticGroup::Procedure)
        .term("bone scan", 1, Cui::new(7))
        .build();
    // Two skipped tokens between "bone" and "scan".
    let tokens = vec![
        RawToken::word("bone", 0),
        RawToken::word("density", 5),
        RawToken::word("and", 13),
        RawToken::word("scan", 17),
    ];
    let window = extract_window(&tokens, 3, &HashSet::new());

    assert_eq!(OverlapMatcher::new(2, 2).find_terms(&dict, &window).len(), 1);
    assert!(OverlapMatcher::new(2, 1).find_terms(&dict, &window).is_empty());
}

/// Anchor eligibility: a two-character token never anchors at min_span 3,
/// even with a matching dictionary entry.
#[test]
fn min_span_blocks_short_anchors() {
    let dict = RareWordDictionary::builder("mixed", SemanticGroup::Unknown)
        .term("mg", 0, Cui::new(9))
        .build();
    let tokens = vec![RawToken::word("mg", 0)];
    let window = extract_window(&tokens, 3, &HashSet::new());
    assert!(ExactMatcher.find_terms(&dict, &window).is_empty());
    assert!(OverlapMatcher::default().find_terms(&dict, &window).is_empty());

    let relaxed = extract_window(&tokens, 2, &HashSet::new());
    assert_eq!(ExactMatcher.find_terms(&dict, &relaxed).len(), 1);
}

fn engine_with(
    dictionaries: Vec<RareWordDictionary>,
    matcher: MatcherKind,
) -> LookupEngine {
    let config = LookupConfig {
        matcher,
        ..LookupConfig::default()
    };
    LookupEngine::new(config, dictionaries.into_iter().map(Arc::new).collect())
        .expect("valid configuration")
}

/// Anatomy vs finding at the same span: the finding reading is dropped.
#[test]
fn pipeline_prefers_anatomy_over_finding_at_identical_spans() {
    let anatomy = RareWordDictionary::builder("anatomy", SemanticGroup::AnatomicalSite)
        .term("abdomen", 0, Cui::new(10))
        .build();
    let findings = RareWordDictionary::builder("findings", SemanticGroup::Finding)
        .term("abdomen", 0, Cui::new(20))
        .build();
    let engine = engine_with(vec![anatomy, findings], MatcherKind::Exact);

    let tokens = vec![RawToken::word("abdomen", 0)];
    let annotations = engine.process_window(&tokens, &no_concepts());

    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].group, SemanticGroup::AnatomicalSite);
    assert_eq!(annotations[0].concepts[0].cui, Cui::new(10));
}

/// A finding wholly inside a disorder mention is folded into it.
#[test]
fn pipeline_folds_contained_findings_into_disorders() {
    let disorders = RareWordDictionary::builder("disorders", SemanticGroup::Disorder)
        .term("congestive heart failure", 2, Cui::new(30))
        .build();
    let findings = RareWordDictionary::builder("findings", SemanticGroup::Finding)
        .term("heart failure", 1, Cui::new(40))
        .build();
    let engine = engine_with(vec![disorders, findings], MatcherKind::Exact);

    let tokens = vec![
        RawToken::word("congestive", 0),
        RawToken::word("heart", 11),
        RawToken::word("failure", 17),
    ];
    let annotations = engine.process_window(&tokens, &no_concepts());

    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].group, SemanticGroup::Disorder);
    assert_eq!((annotations[0].begin, annotations[0].end), (0, 24));
}

/// Post-cleanup output never retains a strictly contained span.
#[test]
fn pipeline_output_satisfies_the_containment_invariant() {
    let disorders = RareWordDictionary::builder("disorders", SemanticGroup::Disorder)
        .term("diabetes", 0, Cui::new(50))
        .term("diabetes mellitus", 0, Cui::new(51))
        .build();
    let engine = engine_with(vec![disorders], MatcherKind::Exact);

    let tokens = vec![RawToken::word("diabetes", 0), RawToken::word("mellitus", 9)];
    let annotations = engine.process_window(&tokens, &no_concepts());

    assert_eq!(annotations.len(), 1, "inner span trimmed: {annotations:?}");
    assert_eq!((annotations[0].begin, annotations[0].end), (0, 17));

    for a in &annotations {
        for b in &annotations {
            let outer = TextSpan::new(a.begin, a.end);
            let inner = TextSpan::new(b.begin, b.end);
            assert!(
                !(a.group == b.group && outer.strictly_contains(&inner)),
                "{outer} strictly contains {inner}"
            );
        }
    }
}

/// The engine's full output is stable across runs.
#[test]
fn pipeline_is_deterministic() {
    let disorders = RareWordDictionary::builder("disorders", SemanticGroup::Disorder)
        .term("breast cancer", 1, Cui::new(100))
        .build();
    let anatomy = RareWordDictionary::builder("anatomy", SemanticGroup::AnatomicalSite)
        .term("breast", 0, Cui::new(60))
        .build();
    let engine = engine_with(vec![disorders, anatomy], MatcherKind::Overlap);

    let tokens = vec![RawToken::word("breast", 0), RawToken::word("cancer", 7)];
    let first = engine.process_window(&tokens, &no_concepts());
    let second = engine.process_window(&tokens, &no_concepts());
    assert_eq!(first, second);
    assert_eq!(first.len(), 2, "anatomy [0,6) and disorder [0,13) both survive");
}

/// Identifier-only degradation end to end: no concept table at all.
#[test]
fn pipeline_degrades_gracefully_without_concept_data() {
    let drugs = RareWordDictionary::builder("drugs", SemanticGroup::Drug)
        .term("aspirin", 0, Cui::new(70))
        .build();
    let engine = engine_with(vec![drugs], MatcherKind::Exact);

    let tokens = vec![RawToken::word("aspirin", 0)];
    let annotations = engine.process_window(&tokens, &no_concepts());
    assert_eq!(annotations[0].concepts, vec![Concept::identifier_only(Cui::new(70))]);
}

/// Concepts resolve with preferred text and codes when the table has them.
#[test]
fn pipeline_attaches_resolved_concepts() {
    let disorders = RareWordDictionary::builder("disorders", SemanticGroup::Disorder)
        .term("breast cancer", 1, Cui::new(100))
        .build();
    let engine = engine_with(vec![disorders], MatcherKind::Exact);

    let resolver: BTreeMap<Cui, Vec<Concept>> = [(
        Cui::new(100),
        vec![
            Concept::new(Cui::new(100), "Malignant neoplasm of breast")
                .with_tui("T191")
                .with_code("SNOMEDCT_US", "254837009"),
        ],
    )]
    .into_iter()
    .collect();

    let tokens = vec![RawToken::word("breast", 0), RawToken::word("cancer", 7)];
    let annotations = engine.process_window(&tokens, &resolver);

    let concept = &annotations[0].concepts[0];
    assert_eq!(concept.preferred_text.as_deref(), Some("Malignant neoplasm of breast"));
    assert!(concept.codes["SNOMEDCT_US"].contains("254837009"));
}
