//! # Block Tree Normalizer
//!
//! Repairs the raw tree into the shape renderers accept:
//!
//! - **Lifting**: tables, code blocks, headings, thematic breaks and
//!   blockquotes nested in list items are promoted to top-level siblings.
//!   The list is split around each promoted block, so one source list may
//!   become several list fragments interleaved with the promoted blocks, all
//!   in source order.
//! - **Blockquote flattening**: blockquote interiors are reduced to a flat
//!   run of paragraphs.
//!
//! A numbered list that had anything lifted out of it is emitted as bulleted
//! fragments; numbering cannot survive the split.
//!
//! Normalizing an already normalized tree returns it unchanged.

use super::tree::{BlockNode, ListItem, TaskListItem};

/// Normalizes a raw tree. See the module docs.
pub fn normalize(tree: Vec<BlockNode>) -> Vec<BlockNode> {
    let mut out = Vec::with_capacity(tree.len());
    let mut lifted = 0;
    for node in tree {
        normalize_node(node, &mut out, &mut lifted);
    }
    if lifted > 0 {
        log::debug!("lifted {lifted} block(s) out of list items");
    }
    out
}

fn normalize_node(node: BlockNode, out: &mut Vec<BlockNode>, lifted: &mut usize) {
    match RawList::from_node(node) {
        Ok(list) => {
            for piece in split_list(list) {
                match piece {
                    Piece::Fragment(fragment) => out.push(fragment),
                    Piece::Lifted(block) => {
                        *lifted += 1;
                        normalize_node(block, out, lifted);
                    }
                }
            }
        }
        Err(BlockNode::Blockquote { children }) => out.push(BlockNode::Blockquote {
            children: flatten_blockquote(children),
        }),
        Err(other) => out.push(other),
    }
}

/// The three list kinds, with what each needs to be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListShape {
    Bulleted,
    Numbered(u64),
    Task,
}

/// A list taken apart into a kind-independent form.
struct RawList {
    shape: ListShape,
    tight: bool,
    /// `(done, children)` per item; `done` is only meaningful for task lists.
    items: Vec<(bool, Vec<BlockNode>)>,
}

impl RawList {
    fn from_node(node: BlockNode) -> Result<Self, BlockNode> {
        match node {
            BlockNode::BulletedList { tight, items } => Ok(Self {
                shape: ListShape::Bulleted,
                tight,
                items: items.into_iter().map(|i| (false, i.children)).collect(),
            }),
            BlockNode::NumberedList { tight, start, items } => Ok(Self {
                shape: ListShape::Numbered(start),
                tight,
                items: items.into_iter().map(|i| (false, i.children)).collect(),
            }),
            BlockNode::TaskList { tight, items } => Ok(Self {
                shape: ListShape::Task,
                tight,
                items: items.into_iter().map(|i| (i.done, i.children)).collect(),
            }),
            other => Err(other),
        }
    }
}

fn build_list(shape: ListShape, tight: bool, items: Vec<(bool, Vec<BlockNode>)>) -> BlockNode {
    match shape {
        ListShape::Bulleted => BlockNode::BulletedList {
            tight,
            items: items
                .into_iter()
                .map(|(_, children)| ListItem { children })
                .collect(),
        },
        ListShape::Numbered(start) => BlockNode::NumberedList {
            tight,
            start,
            items: items
                .into_iter()
                .map(|(_, children)| ListItem { children })
                .collect(),
        },
        ListShape::Task => BlockNode::TaskList {
            tight,
            items: items
                .into_iter()
                .map(|(done, children)| TaskListItem { done, children })
                .collect(),
        },
    }
}

/// One output unit of a split list.
#[derive(Debug)]
enum Piece {
    Fragment(BlockNode),
    Lifted(BlockNode),
}

/// Intermediate piece before the fragment kind is known.
enum Pending {
    Items(Vec<(bool, Vec<BlockNode>)>),
    Lifted(BlockNode),
}

/// Splits a list around every liftable block found in its items, nested
/// lists included.
fn split_list(list: RawList) -> Vec<Piece> {
    let RawList { shape, tight, items } = list;
    let mut pending = Vec::new();
    let mut group: Vec<(bool, Vec<BlockNode>)> = Vec::new();
    let mut lifted_any = false;

    for (done, children) in items {
        let mut current: Vec<BlockNode> = Vec::new();
        let mut item_split = false;

        for child in children {
            if child.is_liftable() {
                close_group(&mut pending, &mut group, &mut current, done);
                pending.push(Pending::Lifted(child));
                lifted_any = true;
                item_split = true;
                continue;
            }

            match RawList::from_node(child) {
                Ok(nested) => {
                    for piece in split_list(nested) {
                        match piece {
                            Piece::Fragment(fragment) => current.push(fragment),
                            Piece::Lifted(block) => {
                                close_group(&mut pending, &mut group, &mut current, done);
                                pending.push(Pending::Lifted(block));
                                lifted_any = true;
                                item_split = true;
                            }
                        }
                    }
                }
                Err(retained) => current.push(retained),
            }
        }

        // An item emptied by lifting contributes nothing; an item that was
        // empty in the source is kept.
        if !current.is_empty() || !item_split {
            group.push((done, current));
        }
    }
    if !group.is_empty() {
        pending.push(Pending::Items(group));
    }

    let shape = match shape {
        ListShape::Numbered(_) if lifted_any => ListShape::Bulleted,
        shape => shape,
    };
    pending
        .into_iter()
        .map(|p| match p {
            Pending::Items(items) => Piece::Fragment(build_list(shape, tight, items)),
            Pending::Lifted(block) => Piece::Lifted(block),
        })
        .collect()
}

/// Ends the current item part and the current fragment ahead of a lifted block.
fn close_group(
    pending: &mut Vec<Pending>,
    group: &mut Vec<(bool, Vec<BlockNode>)>,
    current: &mut Vec<BlockNode>,
    done: bool,
) {
    if !current.is_empty() {
        group.push((done, std::mem::take(current)));
    }
    if !group.is_empty() {
        pending.push(Pending::Items(std::mem::take(group)));
    }
}

/// Reduces blockquote children to a flat run of paragraphs.
///
/// Headings keep their inline content, code becomes a plain-text paragraph,
/// list items and nested blockquotes are flattened in place, tables yield one
/// paragraph per cell, thematic breaks are dropped.
pub fn flatten_blockquote(children: Vec<BlockNode>) -> Vec<BlockNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        flatten_into(child, &mut out);
    }
    out
}

fn flatten_into(node: BlockNode, out: &mut Vec<BlockNode>) {
    match node {
        BlockNode::Paragraph { .. } => out.push(node),
        BlockNode::Heading { content, .. } => out.push(BlockNode::Paragraph { content }),
        BlockNode::CodeBlock { content, .. } => {
            out.push(BlockNode::text_paragraph(content.trim_end_matches('\n')))
        }
        BlockNode::Blockquote { children } => {
            for child in children {
                flatten_into(child, out);
            }
        }
        BlockNode::BulletedList { items, .. } | BlockNode::NumberedList { items, .. } => {
            for child in items.into_iter().flat_map(|item| item.children) {
                flatten_into(child, out);
            }
        }
        BlockNode::TaskList { items, .. } => {
            for child in items.into_iter().flat_map(|item| item.children) {
                flatten_into(child, out);
            }
        }
        BlockNode::Table { rows, .. } => {
            for cell in rows.into_iter().flat_map(|row| row.cells) {
                out.push(BlockNode::Paragraph {
                    content: cell.content,
                });
            }
        }
        BlockNode::ThematicBreak => {}
    }
}
