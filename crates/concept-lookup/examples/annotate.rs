use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use concept_lookup::{
    CachedResolver, LookupConfig, LookupEngine, MatcherKind, RawToken,
};
use umls_dict::{ConceptTable, RareWordDictionary};
use umls_types::{Concept, Cui, SemanticGroup};

fn main() -> Result<()> {
    init_tracing();

    let mut args = env::args().skip(1);
    let dict_path = args.next().map(PathBuf::from);
    let concepts_path = args.next().map(PathBuf::from);

    let (dictionary, table) = match dict_path {
        Some(path) => {
            let dictionary = RareWordDictionary::load(&path)
                .with_context(|| format!("loading dictionary from {}", path.display()))?;
            let table = match concepts_path {
                Some(path) => ConceptTable::load(&path)
                    .with_context(|| format!("loading concepts from {}", path.display()))?,
                None => ConceptTable::from_concepts(Vec::new()),
            };
            (dictionary, table)
        }
        None => demo_terminology(),
    };

    println!(
        "dictionary {:?}: {} terms under {} anchors",
        dictionary.name(),
        dictionary.term_count(),
        dictionary.anchor_count()
    );

    let engine = LookupEngine::new(
        LookupConfig {
            matcher: MatcherKind::Overlap,
            ..LookupConfig::default()
        },
        vec![Arc::new(dictionary)],
    )?;
    let resolver = CachedResolver::new(table);

    // "blood, urine, sputum cultures were obtained" as the upstream
    // tokenizer would hand it over.
    let tokens = vec![
        RawToken::word("blood", 0),
        RawToken::punct(",", 5),
        RawToken::word("urine", 7),
        RawToken::punct(",", 12),
        RawToken::word("sputum", 14),
        RawToken::word("cultures", 21).with_variant("culture"),
        RawToken::word("were", 30),
        RawToken::word("obtained", 35),
    ];

    let annotations = engine.process_window(&tokens, &resolver);
    println!("{}", serde_json::to_string_pretty(&annotations)?);

    Ok(())
}

fn demo_terminology() -> (RareWordDictionary, ConceptTable) {
    let dictionary = RareWordDictionary::builder("demo", SemanticGroup::Procedure)
        .term("blood culture", 1, Cui::new(200))
        .term("urine culture", 1, Cui::new(201))
        .term("sputum culture", 1, Cui::new(202))
        .build();
    let table = ConceptTable::from_concepts(vec![
        Concept::new(Cui::new(200), "Blood culture")
            .with_tui("T059")
            .with_code("SNOMEDCT_US", "30088009"),
        Concept::new(Cui::new(201), "Urine culture").with_tui("T059"),
    ]);
    (dictionary, table)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
