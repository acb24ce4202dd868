//! Load rare-word terminologies and concept tables from flat files.
//!
//! A terminology directory holds bar-separated files: a dictionary of
//! multi-word terms indexed by their rarest word, and an optional concept
//! table mapping CUIs to preferred text, semantic types, and per-vocabulary
//! codes. Both structures are built once, are immutable afterwards, and are
//! cheap to share across worker threads behind an `Arc`.
//!
//! Callers choose between memory-mapped and owned buffers at runtime via
//! [`LoadMode`]; the parsed structures own their strings either way, so the
//! choice only affects how the source bytes are read.
//!
//! # Dictionary format
//! One term per line, `CUI|anchor_index|token_count|term text`:
//! ```text
//! ;;group=disorder
//! C0006142|1|2|breast cancer
//! C0018802|2|3|congestive heart failure
//! ```
//! `#` lines are comments; a leading `;;group=<code>` pragma declares the
//! semantic group carried by every term in the file (absent means `unknown`,
//! i.e. mixed types resolved later through concept lookup).
//!
//! # Concept table format
//! One row per `(CUI, TUI, vocabulary, code)`, rows merged per CUI:
//! ```text
//! C0006142|T191|Malignant neoplasm of breast|SNOMEDCT_US|254837009
//! ```
//!
//! # Example
//! ```no_run
//! use umls_dict::{LoadMode, RareWordDictionary};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dict = RareWordDictionary::load_with_mode("dict/disorders.bsv", LoadMode::Mmap)?;
//! println!("{}: {} terms under {} anchors", dict.name(), dict.term_count(), dict.anchor_count());
//! for term in dict.terms_for("cancer") {
//!     println!("{} -> {}", term.text, term.cui);
//! }
//! # Ok(()) }
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use umls_types::{Concept, Cui, RareWordTerm, SemanticGroup};

/// Strategy for reading terminology files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the source file (fast, no copy of the raw bytes).
    Mmap,
    /// Read the file into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

/// A read-only rare-word index: anchor word to the multi-word terms that
/// contain it, plus the semantic group declared for the whole file.
#[derive(Debug)]
pub struct RareWordDictionary {
    name: String,
    group: SemanticGroup,
    entries: HashMap<String, Vec<RareWordTerm>>,
    term_count: usize,
}

impl RareWordDictionary {
    /// Load a dictionary file, deriving its name from the file stem.
    ///
    /// Defaults to memory-mapping the source. Use
    /// [`load_with_mode`](Self::load_with_mode) to force an owned buffer.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap)
    }

    /// Load a dictionary file choosing the read strategy at runtime.
    pub fn load_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dictionary".to_string());
        let buffer = load_file(path, mode)?;

        let mut group = SemanticGroup::Unknown;
        let mut builder = DictionaryBuilder::new(name, group);
        for (lineno, raw_line) in buffer.as_slice().split(|b| *b == b'\n').enumerate() {
            let line = strip_cr(raw_line);
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }
            let line = std::str::from_utf8(line)
                .with_context(|| format!("{}:{} is not UTF-8", path.display(), lineno + 1))?;
            if let Some(code) = line.strip_prefix(";;group=") {
                group = SemanticGroup::from_code(code.trim()).with_context(|| {
                    format!("{}:{} unknown semantic group {code:?}", path.display(), lineno + 1)
                })?;
                builder.group = group;
                continue;
            }
            let (cui, anchor_index, token_count, text) = parse_term_line(line)
                .with_context(|| format!("{}:{} malformed term line", path.display(), lineno + 1))?;
            builder = builder.term_checked(text, token_count, anchor_index, cui).with_context(
                || format!("{}:{} inconsistent term record", path.display(), lineno + 1),
            )?;
        }
        Ok(builder.build())
    }

    /// Start an in-memory dictionary, for tests and embedders that construct
    /// terminologies programmatically.
    pub fn builder(name: impl Into<String>, group: SemanticGroup) -> DictionaryBuilder {
        DictionaryBuilder::new(name.into(), group)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The semantic group declared for every term in this dictionary;
    /// [`SemanticGroup::Unknown`] means mixed types resolved via concept
    /// lookup.
    pub fn semantic_group(&self) -> SemanticGroup {
        self.group
    }

    /// All terms anchored on `word`, or an empty slice.
    pub fn terms_for(&self, word: &str) -> &[RareWordTerm] {
        static EMPTY: [RareWordTerm; 0] = [];
        self.entries.get(word).map(Vec::as_slice).unwrap_or(&EMPTY)
    }

    /// Number of distinct anchor words.
    pub fn anchor_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of term entries across all anchors.
    pub fn term_count(&self) -> usize {
        self.term_count
    }
}

fn parse_term_line(line: &str) -> Result<(Cui, usize, usize, &str)> {
    let mut fields = line.splitn(4, '|');
    let cui_field = fields.next().context("missing CUI field")?;
    let cui = Cui::parse(cui_field.trim())
        .with_context(|| format!("invalid CUI {cui_field:?}"))?;
    let anchor_index: usize = fields
        .next()
        .context("missing anchor index field")?
        .trim()
        .parse()
        .context("anchor index is not an integer")?;
    let token_count: usize = fields
        .next()
        .context("missing token count field")?
        .trim()
        .parse()
        .context("token count is not an integer")?;
    let text = fields.next().context("missing term text field")?.trim();
    if text.is_empty() {
        anyhow::bail!("empty term text");
    }
    Ok((cui, anchor_index, token_count, text))
}

/// Accumulates terms into a [`RareWordDictionary`].
pub struct DictionaryBuilder {
    name: String,
    group: SemanticGroup,
    entries: HashMap<String, Vec<RareWordTerm>>,
    term_count: usize,
}

impl DictionaryBuilder {
    fn new(name: impl Into<String>, group: SemanticGroup) -> Self {
        Self {
            name: name.into(),
            group,
            entries: HashMap::new(),
            term_count: 0,
        }
    }

    /// Add a term by its text, anchor position, and CUI. The token count is
    /// derived from the text. Panics on an out-of-range anchor index, which
    /// is a bug in the calling test or embedder.
    pub fn term(self, text: &str, anchor_index: usize, cui: Cui) -> Self {
        let token_count = text.split_whitespace().count();
        self.term_checked(text, token_count, anchor_index, cui)
            .expect("programmatic term must be consistent")
    }

    fn term_checked(
        mut self,
        text: &str,
        token_count: usize,
        anchor_index: usize,
        cui: Cui,
    ) -> Result<Self> {
        let normalized = text.to_lowercase();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        if words.is_empty() {
            anyhow::bail!("empty term text");
        }
        if words.len() != token_count {
            anyhow::bail!(
                "token count {} does not match term text {:?}",
                token_count,
                text
            );
        }
        let anchor = *words
            .get(anchor_index)
            .with_context(|| format!("anchor index {anchor_index} out of range for {text:?}"))?;
        let term = RareWordTerm::new(words.join(" "), token_count, anchor_index, cui);
        self.entries.entry(anchor.to_string()).or_default().push(term);
        self.term_count += 1;
        Ok(self)
    }

    pub fn build(self) -> RareWordDictionary {
        let mut entries = self.entries;
        for terms in entries.values_mut() {
            terms.sort_by(|a, b| a.text.cmp(&b.text).then(a.cui.cmp(&b.cui)));
            terms.dedup();
        }
        let term_count = entries.values().map(Vec::len).sum();
        RareWordDictionary {
            name: self.name,
            group: self.group,
            entries,
            term_count,
        }
    }
}

/// A read-only CUI-to-concept table merged from bar-separated rows.
pub struct ConceptTable {
    concepts: HashMap<Cui, Concept>,
}

impl ConceptTable {
    /// Load a concept table file. Defaults to memory-mapping the source.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap)
    }

    /// Load a concept table choosing the read strategy at runtime.
    pub fn load_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let buffer = load_file(path, mode)?;
        let mut concepts: HashMap<Cui, Concept> = HashMap::new();

        for (lineno, raw_line) in buffer.as_slice().split(|b| *b == b'\n').enumerate() {
            let line = strip_cr(raw_line);
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }
            let line = std::str::from_utf8(line)
                .with_context(|| format!("{}:{} is not UTF-8", path.display(), lineno + 1))?;
            let row = parse_concept_line(line)
                .with_context(|| format!("{}:{} malformed concept row", path.display(), lineno + 1))?;

            let concept = concepts
                .entry(row.cui)
                .or_insert_with(|| Concept::identifier_only(row.cui));
            if concept.preferred_text.is_none() && !row.preferred_text.is_empty() {
                concept.preferred_text = Some(row.preferred_text.to_string());
            }
            if !row.tui.is_empty() {
                concept.tuis.insert(row.tui.to_string());
            }
            if let (Some(sab), Some(code)) = (row.vocabulary, row.code) {
                concept
                    .codes
                    .entry(sab.to_string())
                    .or_default()
                    .insert(code.to_string());
            }
        }
        Ok(Self { concepts })
    }

    /// Build a table from already-resolved concept records.
    pub fn from_concepts(concepts: impl IntoIterator<Item = Concept>) -> Self {
        Self {
            concepts: concepts.into_iter().map(|c| (c.cui, c)).collect(),
        }
    }

    pub fn get(&self, cui: Cui) -> Option<&Concept> {
        self.concepts.get(&cui)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

struct ConceptRow<'a> {
    cui: Cui,
    tui: &'a str,
    preferred_text: &'a str,
    vocabulary: Option<&'a str>,
    code: Option<&'a str>,
}

fn parse_concept_line(line: &str) -> Result<ConceptRow<'_>> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < 3 {
        anyhow::bail!("expected at least CUI|TUI|preferred text");
    }
    let cui = Cui::parse(fields[0].trim())
        .with_context(|| format!("invalid CUI {:?}", fields[0]))?;
    let tui = fields[1].trim();
    let preferred_text = fields[2].trim();
    let vocabulary = fields.get(3).map(|s| s.trim()).filter(|s| !s.is_empty());
    let code = fields.get(4).map(|s| s.trim()).filter(|s| !s.is_empty());
    Ok(ConceptRow {
        cui,
        tui,
        preferred_text,
        vocabulary,
        code,
    })
}
