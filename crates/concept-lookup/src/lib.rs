//! Rare-word term lookup over tokenized clinical text.
//!
//! Given one window of tokens (typically a sentence), the engine finds every
//! dictionary term occurring there, as an exact contiguous sequence or as a
//! bounded, order-preserving, skip-tolerant one, then reconciles competing
//! semantic readings so each span carries its most specific concepts.
//!
//! The pipeline per window: [`extract_window`] builds lookup tokens and
//! anchor indices, a [`TermMatcher`] strategy runs once per dictionary, hits
//! are grouped by semantic group (via the dictionary's declared group, or
//! per-CUI concept lookup for mixed dictionaries), [`resolve_conflicts`]
//! applies the cross- and within-group rules, and [`assemble_annotations`]
//! emits the output records.
//!
//! Dictionaries and concept sources are read-only collaborators built
//! elsewhere (see `umls-dict`); the engine itself performs no I/O and holds
//! no per-window state, so independent windows can run on separate workers
//! sharing one engine.
//!
//! # Example
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use concept_lookup::{LookupConfig, LookupEngine, RawToken};
//! use umls_dict::RareWordDictionary;
//! use umls_types::{Concept, Cui, SemanticGroup};
//!
//! let dictionary = RareWordDictionary::builder("disorders", SemanticGroup::Disorder)
//!     .term("breast cancer", 1, Cui::new(100))
//!     .build();
//! let engine = LookupEngine::new(LookupConfig::default(), vec![Arc::new(dictionary)])
//!     .expect("valid configuration");
//!
//! let resolver: BTreeMap<Cui, Vec<Concept>> = BTreeMap::new();
//! let tokens = vec![RawToken::word("breast", 0), RawToken::word("cancer", 7)];
//! let annotations = engine.process_window(&tokens, &resolver);
//!
//! assert_eq!(annotations.len(), 1);
//! assert_eq!((annotations[0].begin, annotations[0].end), (0, 13));
//! assert_eq!(annotations[0].group, SemanticGroup::Disorder);
//! ```

mod annotate;
mod cleanup;
mod collections;
mod exact;
mod matcher;
mod overlap;
mod resolver;
mod window;

pub use annotate::{Annotation, assemble_annotations};
pub use cleanup::{GroupHits, SemanticGroupHits, resolve_conflicts};
pub use collections::SpanMultimap;
pub use exact::ExactMatcher;
pub use matcher::{HitMap, MatcherKind, MatcherStrategy, TermMatcher};
pub use overlap::{DEFAULT_CONSECUTIVE_SKIP_MAX, DEFAULT_TOTAL_SKIP_MAX, OverlapMatcher};
pub use resolver::{CachedResolver, ConceptResolver};
pub use window::{LookupWindow, RawToken, TokenKind, extract_window};

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use umls_dict::RareWordDictionary;
use umls_types::SemanticGroup;

/// Default minimum covered-text length for an anchor-eligible token.
pub const DEFAULT_MIN_SPAN: usize = 3;

/// Rejected configuration. Raised at engine construction, never during a
/// match call.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("minimum lookup span must be positive")]
    ZeroMinSpan,
    #[error("consecutive skip maximum {consecutive} exceeds total skip maximum {total}")]
    SkipBudgetInverted { consecutive: usize, total: usize },
    #[error("excluded part-of-speech tags must not be blank")]
    BlankPosTag,
}

/// Values consumed by the engine; how they are supplied (file, env, defaults)
/// is the caller's concern.
#[derive(Clone, Debug)]
pub struct LookupConfig {
    /// Minimum covered-text length for anchor eligibility.
    pub min_span: usize,
    /// Part-of-speech tags whose tokens never anchor a lookup.
    pub excluded_pos: HashSet<String>,
    /// Overlap matcher: maximum consecutive skipped tokens per direction.
    pub consecutive_skip_max: usize,
    /// Overlap matcher: maximum total skipped tokens per direction.
    pub total_skip_max: usize,
    /// Which matching strategy to run.
    pub matcher: MatcherKind,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            min_span: DEFAULT_MIN_SPAN,
            excluded_pos: HashSet::new(),
            consecutive_skip_max: DEFAULT_CONSECUTIVE_SKIP_MAX,
            total_skip_max: DEFAULT_TOTAL_SKIP_MAX,
            matcher: MatcherKind::default(),
        }
    }
}

impl LookupConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_span == 0 {
            return Err(ConfigError::ZeroMinSpan);
        }
        if self.consecutive_skip_max > self.total_skip_max {
            return Err(ConfigError::SkipBudgetInverted {
                consecutive: self.consecutive_skip_max,
                total: self.total_skip_max,
            });
        }
        if self.excluded_pos.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ConfigError::BlankPosTag);
        }
        Ok(())
    }
}

/// The per-window lookup pipeline over a fixed set of dictionaries.
///
/// Construction validates the configuration and fixes the matcher strategy;
/// afterwards the engine is immutable and shareable across worker threads.
pub struct LookupEngine {
    config: LookupConfig,
    matcher: MatcherStrategy,
    dictionaries: Vec<Arc<RareWordDictionary>>,
}

impl LookupEngine {
    pub fn new(
        config: LookupConfig,
        dictionaries: Vec<Arc<RareWordDictionary>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let matcher = match config.matcher {
            MatcherKind::Exact => MatcherStrategy::Exact(ExactMatcher),
            MatcherKind::Overlap => MatcherStrategy::Overlap(OverlapMatcher::new(
                config.consecutive_skip_max,
                config.total_skip_max,
            )),
        };
        Ok(Self {
            config,
            matcher,
            dictionaries,
        })
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Run the full pipeline for one window. A window with no tokens or no
    /// anchor-eligible tokens yields an empty result; it is not an error.
    pub fn process_window(
        &self,
        tokens: &[RawToken],
        resolver: &impl ConceptResolver,
    ) -> Vec<Annotation> {
        let window = extract_window(tokens, self.config.min_span, &self.config.excluded_pos);
        if window.anchors.is_empty() {
            debug!(tokens = window.tokens.len(), "window has no anchor candidates");
            return Vec::new();
        }

        let mut grouped = SemanticGroupHits::new();
        for dictionary in &self.dictionaries {
            let hits = self.matcher.find_terms(dictionary, &window);
            debug!(
                dictionary = dictionary.name(),
                spans = hits.len(),
                "matched terms"
            );
            group_hits(dictionary.semantic_group(), hits, resolver, &mut grouped);
        }

        resolve_conflicts(&mut grouped);
        assemble_annotations(&grouped, resolver)
    }
}

/// Re-key one dictionary's hits by semantic group. A declared group applies
/// wholesale; a mixed (`Unknown`) dictionary routes each CUI through the
/// resolver, and CUIs without concept data stay under `Unknown`.
fn group_hits(
    declared: SemanticGroup,
    hits: HitMap,
    resolver: &impl ConceptResolver,
    grouped: &mut SemanticGroupHits,
) {
    for (span, cuis) in hits {
        let outer = span.text_span();
        if declared == SemanticGroup::Unknown {
            for cui in cuis {
                let mut groups: BTreeSet<SemanticGroup> = resolver
                    .concepts_for(cui)
                    .iter()
                    .flat_map(|concept| concept.groups())
                    .collect();
                if groups.is_empty() {
                    groups.insert(SemanticGroup::Unknown);
                }
                for group in groups {
                    grouped.entry(group).or_default().insert(outer, cui);
                }
            }
        } else {
            grouped.entry(declared).or_default().insert_all(outer, cuis);
        }
    }
}
