use std::fmt;

use crate::parsing::{
    math::MathTable,
    placeholder::embedded_math_token_regex,
    tree::BlockNode,
};

/// A structural rule a finished tree breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Child indices from the root, e.g. `2/0/1`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Checks the shape guarantees of a normalized, finalized tree:
///
/// - blockquote children are paragraphs;
/// - list item children are paragraphs or lists;
/// - code blocks hold no token whose index exists in `math`.
pub fn violations(tree: &[BlockNode], math: &MathTable) -> Vec<Violation> {
    let mut found = Vec::new();
    for (index, block) in tree.iter().enumerate() {
        check(block, &index.to_string(), math, &mut found);
    }
    found
}

fn check(block: &BlockNode, path: &str, math: &MathTable, found: &mut Vec<Violation>) {
    match block {
        BlockNode::Blockquote { children } => {
            for (i, child) in children.iter().enumerate() {
                if !matches!(child, BlockNode::Paragraph { .. }) {
                    found.push(Violation {
                        path: format!("{path}/{i}"),
                        message: format!("{} inside blockquote", child.kind_name()),
                    });
                }
            }
        }
        BlockNode::BulletedList { items, .. } | BlockNode::NumberedList { items, .. } => {
            for (i, item) in items.iter().enumerate() {
                check_item(&item.children, &format!("{path}/{i}"), math, found);
            }
        }
        BlockNode::TaskList { items, .. } => {
            for (i, item) in items.iter().enumerate() {
                check_item(&item.children, &format!("{path}/{i}"), math, found);
            }
        }
        BlockNode::CodeBlock { content, .. } => {
            if has_live_token(content, math) {
                found.push(Violation {
                    path: path.to_string(),
                    message: "placeholder token left in code block".into(),
                });
            }
        }
        _ => {}
    }
}

/// True when `content` still holds a token the finalizer should have
/// replaced. Math the user wrote around token-shaped text comes back
/// verbatim, so the restored raw text of each entry is skipped.
fn has_live_token(content: &str, math: &MathTable) -> bool {
    let Some(regex) = embedded_math_token_regex() else {
        return false;
    };
    let mut remaining = content.to_string();
    for (_, entry) in math.iter() {
        if regex.is_match(&entry.raw) {
            remaining = remaining.replace(&entry.raw, "");
        }
    }
    regex.captures_iter(&remaining).any(|caps| {
        caps[1]
            .parse::<usize>()
            .is_ok_and(|index| math.entry(index).is_some())
    })
}

fn check_item(children: &[BlockNode], path: &str, math: &MathTable, found: &mut Vec<Violation>) {
    for (i, child) in children.iter().enumerate() {
        let child_path = format!("{path}/{i}");
        if child.is_list() {
            check(child, &child_path, math, found);
        } else if !matches!(child, BlockNode::Paragraph { .. }) {
            found.push(Violation {
                path: child_path,
                message: format!("{} inside list item", child.kind_name()),
            });
        }
    }
}
