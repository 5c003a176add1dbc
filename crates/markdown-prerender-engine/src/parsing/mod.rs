//! # Markdown Preprocessing Pipeline
//!
//! Raw, possibly half-streamed markdown in; normalized block tree and math
//! table out.
//!
//! ```text
//! raw ─ math::extract ─▶ indexed ─ tree::build_tree ─▶ raw tree
//!     ─ normalize ─▶ normalized tree ─ finalize ─▶ final tree + MathTable
//! ```
//!
//! ## Modules
//!
//! - **`math`**: document-level math extraction and the inline sweep
//! - **`placeholder`**: the `md://content?...` token codec
//! - **`tree`**: node types and the `pulldown-cmark` event folder
//! - **`tagfilter`**: GFM disallowed raw HTML filter
//! - **`normalize`**: list splitting and blockquote flattening
//! - **`finalize`**: token resolution, inline sweep and autolinking
//! - **`autolink`**: bare URL linking
//! - **`ranges`**: top-level block byte ranges
//! - **`snapshot`**: outlines and invariant checks
//!
//! Every stage is a pure function of its input; nothing here does I/O.

pub mod autolink;
pub mod finalize;
pub mod math;
pub mod normalize;
pub mod placeholder;
pub mod ranges;
pub mod snapshot;
pub mod tagfilter;
pub mod tree;

#[cfg(test)]
mod tests;

use serde::Serialize;

use math::MathTable;
use tree::BlockNode;

/// Output of one parse call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub document: Vec<BlockNode>,
    pub math: MathTable,
}

/// A code block found in a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlockRef<'a> {
    pub language: Option<&'a str>,
    pub content: &'a str,
}

impl ParseResult {
    /// Every code block in document order, including those nested in lists
    /// and blockquotes.
    pub fn code_blocks(&self) -> Vec<CodeBlockRef<'_>> {
        let mut out = Vec::new();
        collect_code_blocks(&self.document, &mut out);
        out
    }
}

fn collect_code_blocks<'a>(blocks: &'a [BlockNode], out: &mut Vec<CodeBlockRef<'a>>) {
    for block in blocks {
        match block {
            BlockNode::CodeBlock { language, content } => out.push(CodeBlockRef {
                language: language.as_deref(),
                content,
            }),
            BlockNode::BulletedList { items, .. } | BlockNode::NumberedList { items, .. } => {
                for item in items {
                    collect_code_blocks(&item.children, out);
                }
            }
            BlockNode::TaskList { items, .. } => {
                for item in items {
                    collect_code_blocks(&item.children, out);
                }
            }
            BlockNode::Blockquote { children } => collect_code_blocks(children, out),
            _ => {}
        }
    }
}

/// Runs the preprocessing pipeline.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownParser {
    normalize: bool,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self { normalize: true }
    }
}

impl MarkdownParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips the normalizer, leaving tables, code and headings nested in
    /// list items where the block parser put them. For inspection only;
    /// renderers expect normalized trees.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn parse(&self, markdown: &str) -> ParseResult {
        let math::Extraction { indexed, mut math } = math::extract(markdown);
        let raw = tree::build_tree(&indexed);
        let shaped = if self.normalize {
            normalize::normalize(raw)
        } else {
            raw
        };
        let document = finalize::finalize(shaped, &mut math);

        if self.normalize {
            debug_assert!(
                snapshot::violations(&document, &math).is_empty(),
                "normalized tree breaks structural invariants: {:?}",
                snapshot::violations(&document, &math)
            );
        }
        log::debug!(
            "parsed {} bytes into {} blocks, {} math spans",
            markdown.len(),
            document.len(),
            math.len()
        );

        ParseResult { document, math }
    }
}

/// [`MarkdownParser::parse`] with the default parser.
pub fn parse(markdown: &str) -> ParseResult {
    MarkdownParser::default().parse(markdown)
}
