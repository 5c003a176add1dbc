//! # Placeholder Finalizer
//!
//! Last pipeline stage. Walks every inline-bearing block and:
//!
//! - turns code spans that are math tokens into [`InlineNode::Math`];
//! - sends text runs through the inline math sweep, then the autolinker
//!   (except inside links);
//! - puts the original math text back wherever a token survived verbatim:
//!   code blocks, code spans, raw HTML, link destinations and image sources.
//!
//! Tokens whose index is missing from the table are left as they are.

use regex::{Captures, Regex};

use super::{
    autolink::autolink,
    math::{MathTable, sweep},
    placeholder::{self, Placeholder, embedded_math_token_regex, split_math_token_regex},
    tree::{BlockNode, InlineNode, ListItem, TableCell, TableRow, TaskListItem},
};

/// Finalizes a normalized tree. Newly swept math is appended to `math`.
pub fn finalize(tree: Vec<BlockNode>, math: &mut MathTable) -> Vec<BlockNode> {
    let mut finalizer = Finalizer {
        math,
        converted: 0,
        restored: 0,
        orphans: 0,
    };
    let tree = tree.into_iter().map(|b| finalizer.block(b)).collect();
    log::debug!(
        "finalized placeholders: {} math spans, {} restored verbatim, {} orphaned",
        finalizer.converted,
        finalizer.restored,
        finalizer.orphans
    );
    tree
}

struct Finalizer<'a> {
    math: &'a mut MathTable,
    converted: usize,
    restored: usize,
    orphans: usize,
}

impl Finalizer<'_> {
    fn block(&mut self, node: BlockNode) -> BlockNode {
        match node {
            BlockNode::Heading { level, content } => BlockNode::Heading {
                level,
                content: self.inlines(content, false),
            },
            BlockNode::Paragraph { content } => BlockNode::Paragraph {
                content: self.inlines(content, false),
            },
            BlockNode::BulletedList { tight, items } => BlockNode::BulletedList {
                tight,
                items: items.into_iter().map(|i| self.item(i)).collect(),
            },
            BlockNode::NumberedList { tight, start, items } => BlockNode::NumberedList {
                tight,
                start,
                items: items.into_iter().map(|i| self.item(i)).collect(),
            },
            BlockNode::TaskList { tight, items } => BlockNode::TaskList {
                tight,
                items: items
                    .into_iter()
                    .map(|i| TaskListItem {
                        done: i.done,
                        children: self.blocks(i.children),
                    })
                    .collect(),
            },
            BlockNode::Blockquote { children } => BlockNode::Blockquote {
                children: self.blocks(children),
            },
            BlockNode::CodeBlock { language, content } => BlockNode::CodeBlock {
                language,
                content: self.restore_verbatim(&content),
            },
            BlockNode::Table { alignments, rows } => BlockNode::Table {
                alignments,
                rows: rows
                    .into_iter()
                    .map(|row| TableRow {
                        cells: row
                            .cells
                            .into_iter()
                            .map(|cell| TableCell {
                                content: self.inlines(cell.content, false),
                            })
                            .collect(),
                    })
                    .collect(),
            },
            BlockNode::ThematicBreak => BlockNode::ThematicBreak,
        }
    }

    fn blocks(&mut self, nodes: Vec<BlockNode>) -> Vec<BlockNode> {
        nodes.into_iter().map(|b| self.block(b)).collect()
    }

    fn item(&mut self, item: ListItem) -> ListItem {
        ListItem {
            children: self.blocks(item.children),
        }
    }

    fn inlines(&mut self, nodes: Vec<InlineNode>, in_link: bool) -> Vec<InlineNode> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                InlineNode::Code(code) => out.push(self.code_span(code)),
                InlineNode::Text(text) => self.text_run(&text, in_link, &mut out),
                InlineNode::Html(html) => out.push(InlineNode::Html(self.restore_verbatim(&html))),
                InlineNode::Emphasis(children) => {
                    out.push(InlineNode::Emphasis(self.inlines(children, in_link)))
                }
                InlineNode::Strong(children) => {
                    out.push(InlineNode::Strong(self.inlines(children, in_link)))
                }
                InlineNode::Strikethrough(children) => {
                    out.push(InlineNode::Strikethrough(self.inlines(children, in_link)))
                }
                InlineNode::Link {
                    destination,
                    children,
                } => out.push(InlineNode::Link {
                    destination: self.restore_verbatim(&destination),
                    children: self.inlines(children, true),
                }),
                InlineNode::Image { source, alt } => out.push(InlineNode::Image {
                    source: self.restore_verbatim(&source),
                    alt: self.inlines(alt, true),
                }),
                other => out.push(other),
            }
        }
        out
    }

    fn code_span(&mut self, code: String) -> InlineNode {
        match Placeholder::parse(&code, false).and_then(|p| p.math_index()) {
            Some(index) => match self.math.get(index) {
                Some(source) => {
                    self.converted += 1;
                    InlineNode::Math {
                        source: source.to_string(),
                        identifier: placeholder::math_replacement(index),
                    }
                }
                None => {
                    log::warn!("math placeholder {index} has no table entry");
                    self.orphans += 1;
                    InlineNode::Code(code)
                }
            },
            None => InlineNode::Code(self.restore_split(&code)),
        }
    }

    fn text_run(&mut self, text: &str, in_link: bool, out: &mut Vec<InlineNode>) {
        let text = self.restore_split(text);
        for piece in sweep(&text, self.math) {
            match piece {
                InlineNode::Text(run) if !in_link => match autolink(&run) {
                    Some(linked) => out.extend(linked),
                    None => out.push(InlineNode::Text(run)),
                },
                other => out.push(other),
            }
        }
    }

    /// Replaces every embedded token with the complete text it stood for.
    fn restore_verbatim(&mut self, text: &str) -> String {
        self.restore_with(embedded_math_token_regex(), text)
    }

    /// [`Self::restore_verbatim`] for inline runs, where a token may have lost
    /// its backticks.
    fn restore_split(&mut self, text: &str) -> String {
        self.restore_with(split_math_token_regex(), text)
    }

    fn restore_with(&mut self, regex: Option<&Regex>, text: &str) -> String {
        let Some(regex) = regex else {
            return text.to_string();
        };
        if !regex.is_match(text) {
            return text.to_string();
        }

        let math = &*self.math;
        let mut restored = 0;
        let mut orphans = 0;
        let result = regex
            .replace_all(text, |caps: &Captures| {
                let entry = caps[1].parse::<usize>().ok().and_then(|i| math.entry(i));
                match entry {
                    Some(entry) => {
                        restored += 1;
                        entry.raw.clone()
                    }
                    None => {
                        orphans += 1;
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();
        self.restored += restored;
        self.orphans += orphans;
        result
    }
}
