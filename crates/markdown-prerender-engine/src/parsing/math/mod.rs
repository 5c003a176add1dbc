//! # Math Spans
//!
//! Math is pulled out of the document before block parsing so that the block
//! parser cannot mangle it (`_` and `*` inside formulas would otherwise turn
//! into emphasis, `|` would split table cells).
//!
//! ## Modules
//!
//! - **`extract`**: document-level pass replacing math spans with placeholder tokens
//! - **`sweep`**: inline pass over parsed text runs catching spans the first pass missed
//!
//! Both passes write into the same [`MathTable`].

pub mod extract;
pub mod sweep;

pub use extract::{Extraction, extract};
pub use sweep::sweep;

use serde::Serialize;

use super::placeholder;

/// One extracted math span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MathEntry {
    /// Math source with its delimiters stripped.
    pub source: String,
    /// The complete matched text, delimiters included.
    pub raw: String,
}

/// Dense `index → math source` table for one parse call.
///
/// Indices are handed out in order by [`MathTable::push`] and never reused.
/// Their relation to document position is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MathTable {
    entries: Vec<MathEntry>,
}

impl MathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Math source for `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.source.as_str())
    }

    pub fn entry(&self, index: usize) -> Option<&MathEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &MathEntry)> {
        self.entries.iter().enumerate()
    }

    /// `(placeholder token, math source)` pairs, the key a renderer uses to
    /// attach a rendered formula to a [`crate::InlineNode::Math`] identifier.
    pub fn replacements(&self) -> impl Iterator<Item = (String, &str)> {
        self.iter()
            .map(|(index, entry)| (placeholder::math_replacement(index), entry.source.as_str()))
    }

    pub(crate) fn push(&mut self, source: impl Into<String>, raw: impl Into<String>) -> usize {
        self.entries.push(MathEntry {
            source: source.into(),
            raw: raw.into(),
        });
        self.entries.len() - 1
    }
}
