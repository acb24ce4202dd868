//! Turn a tokenizer's output for one window into lookup tokens and anchor
//! candidates.
//!
//! The extractor is a pure function: it drops newline tokens, keeps every
//! other token in order (matchers need punctuation and numbers in place to
//! verify multi-word terms), and marks which indices may anchor a dictionary
//! lookup.

use std::collections::HashSet;

use umls_types::{LookupToken, TextSpan};

/// Pre-tokenization classification supplied by the external tokenizer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Word,
    Punctuation,
    Number,
    Contraction,
    Symbol,
    Newline,
}

/// One token as handed over by the tokenizer/tagger: lowercased covered
/// text, span, classification, and the optional variant and part-of-speech
/// tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawToken {
    pub text: String,
    pub variant: Option<String>,
    pub span: TextSpan,
    pub kind: TokenKind,
    pub pos_tag: Option<String>,
}

impl RawToken {
    pub fn new(text: impl Into<String>, span: TextSpan, kind: TokenKind) -> Self {
        Self {
            text: text.into(),
            variant: None,
            span,
            kind,
            pos_tag: None,
        }
    }

    /// Word token whose span starts at `begin` and covers its text.
    pub fn word(text: &str, begin: usize) -> Self {
        Self::new(text, TextSpan::new(begin, begin + text.len()), TokenKind::Word)
    }

    /// Punctuation token at `begin`.
    pub fn punct(text: &str, begin: usize) -> Self {
        Self::new(
            text,
            TextSpan::new(begin, begin + text.len()),
            TokenKind::Punctuation,
        )
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_pos_tag(mut self, tag: impl Into<String>) -> Self {
        self.pos_tag = Some(tag.into());
        self
    }
}

/// The extractor's output: all retained tokens in text order plus the
/// indices eligible to anchor a lookup.
#[derive(Clone, Debug, Default)]
pub struct LookupWindow {
    pub tokens: Vec<LookupToken>,
    pub anchors: Vec<usize>,
}

/// Build the lookup window for one sentence-equivalent.
///
/// A token is anchor-eligible when it is a plain word, covers at least
/// `min_span` characters, and its part-of-speech tag (if any) is not
/// excluded. Newline tokens are dropped entirely; everything else is kept so
/// matchers can verify full term sequences.
pub fn extract_window(
    tokens: &[RawToken],
    min_span: usize,
    excluded_pos: &HashSet<String>,
) -> LookupWindow {
    let mut window = LookupWindow {
        tokens: Vec::with_capacity(tokens.len()),
        anchors: Vec::new(),
    };

    for raw in tokens {
        if raw.kind == TokenKind::Newline {
            continue;
        }
        let eligible = raw.kind == TokenKind::Word
            && raw.span.len() >= min_span
            && raw
                .pos_tag
                .as_ref()
                .is_none_or(|tag| !excluded_pos.contains(tag));
        let index = window.tokens.len();
        window.tokens.push(match &raw.variant {
            Some(variant) => LookupToken::with_variant(&raw.text, variant, raw.span),
            None => LookupToken::new(&raw.text, raw.span),
        });
        if eligible {
            window.anchors.push(index);
        }
    }

    window
}
