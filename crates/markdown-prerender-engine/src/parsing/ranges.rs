//! Byte ranges of the top-level blocks of a source text.
//!
//! Runs the block parser directly on the text, without math extraction, so
//! offsets refer to the text the caller holds.

use std::ops::Range;

use pulldown_cmark::{Event, Parser, Tag};
use serde::Serialize;

use super::tree::parser_options;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RootBlockKind {
    Heading,
    Paragraph,
    List,
    Blockquote,
    CodeBlock,
    Table,
    ThematicBreak,
    Html,
}

/// One top-level block and the bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootBlockRange {
    pub kind: RootBlockKind,
    pub range: Range<usize>,
}

impl RootBlockRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.range.contains(&offset)
    }
}

/// Top-level blocks of `text` in document order.
pub fn parse_block_ranges(text: &str) -> Vec<RootBlockRange> {
    let mut out = Vec::new();
    let mut depth = 0usize;

    for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    if let Some(kind) = root_kind(&tag) {
                        out.push(RootBlockRange { kind, range });
                    }
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Rule if depth == 0 => out.push(RootBlockRange {
                kind: RootBlockKind::ThematicBreak,
                range,
            }),
            _ => {}
        }
    }
    out
}

fn root_kind(tag: &Tag<'_>) -> Option<RootBlockKind> {
    Some(match tag {
        Tag::Heading { .. } => RootBlockKind::Heading,
        Tag::Paragraph => RootBlockKind::Paragraph,
        Tag::List(_) => RootBlockKind::List,
        Tag::BlockQuote(_) => RootBlockKind::Blockquote,
        Tag::CodeBlock(_) => RootBlockKind::CodeBlock,
        Tag::Table(_) => RootBlockKind::Table,
        Tag::HtmlBlock => RootBlockKind::Html,
        _ => return None,
    })
}
