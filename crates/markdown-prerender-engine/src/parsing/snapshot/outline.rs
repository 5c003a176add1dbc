use std::fmt::Write;

use crate::parsing::{
    placeholder,
    tree::{BlockNode, ColumnAlignment, InlineNode},
};

/// Renders `tree` as an indented outline, one block per line.
///
/// ```text
/// Heading(1): "Title"
/// BulletedList(tight)
///   - Paragraph: "a " $x$#0
/// CodeBlock(rust): "fn f() {}\n"
/// ```
pub fn outline(tree: &[BlockNode]) -> String {
    let mut out = String::new();
    for block in tree {
        write_block(&mut out, block, 0, "");
    }
    out
}

fn write_block(out: &mut String, block: &BlockNode, depth: usize, marker: &str) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}{marker}");
    match block {
        BlockNode::Heading { level, content } => {
            let _ = writeln!(out, "Heading({level}): {}", inlines(content));
        }
        BlockNode::Paragraph { content } => {
            let _ = writeln!(out, "Paragraph: {}", inlines(content));
        }
        BlockNode::BulletedList { tight, items } => {
            let _ = writeln!(out, "BulletedList({})", tightness(*tight));
            for item in items {
                write_item(out, &item.children, depth + 1, "- ");
            }
        }
        BlockNode::NumberedList {
            tight,
            start,
            items,
        } => {
            let _ = writeln!(out, "NumberedList({}, start={start})", tightness(*tight));
            for item in items {
                write_item(out, &item.children, depth + 1, "1. ");
            }
        }
        BlockNode::TaskList { tight, items } => {
            let _ = writeln!(out, "TaskList({})", tightness(*tight));
            for item in items {
                let marker = if item.done { "[x] " } else { "[ ] " };
                write_item(out, &item.children, depth + 1, marker);
            }
        }
        BlockNode::Blockquote { children } => {
            let _ = writeln!(out, "Blockquote");
            for child in children {
                write_block(out, child, depth + 1, "> ");
            }
        }
        BlockNode::CodeBlock { language, content } => {
            let _ = writeln!(
                out,
                "CodeBlock({}): {content:?}",
                language.as_deref().unwrap_or("")
            );
        }
        BlockNode::Table { alignments, rows } => {
            let alignments: Vec<_> = alignments.iter().map(|a| alignment_name(*a)).collect();
            let _ = writeln!(out, "Table[{}]", alignments.join(", "));
            for row in rows {
                let cells: Vec<_> = row.cells.iter().map(|c| inlines(&c.content)).collect();
                let _ = writeln!(out, "{indent}  | {} |", cells.join(" | "));
            }
        }
        BlockNode::ThematicBreak => {
            let _ = writeln!(out, "ThematicBreak");
        }
    }
}

fn write_item(out: &mut String, children: &[BlockNode], depth: usize, marker: &str) {
    match children.split_first() {
        None => {
            let _ = writeln!(out, "{}{}", "  ".repeat(depth), marker.trim_end());
        }
        Some((first, rest)) => {
            write_block(out, first, depth, marker);
            let continuation = " ".repeat(marker.len());
            for child in rest {
                write_block(out, child, depth, &continuation);
            }
        }
    }
}

fn tightness(tight: bool) -> &'static str {
    if tight { "tight" } else { "loose" }
}

fn alignment_name(alignment: ColumnAlignment) -> &'static str {
    match alignment {
        ColumnAlignment::None => "none",
        ColumnAlignment::Left => "left",
        ColumnAlignment::Center => "center",
        ColumnAlignment::Right => "right",
    }
}

fn inlines(nodes: &[InlineNode]) -> String {
    nodes.iter().map(inline).collect::<Vec<_>>().join(" ")
}

fn inline(node: &InlineNode) -> String {
    match node {
        InlineNode::Text(text) => format!("{text:?}"),
        InlineNode::SoftBreak => "<soft>".into(),
        InlineNode::LineBreak => "<br>".into(),
        InlineNode::Code(code) => format!("`{code}`"),
        InlineNode::Html(html) => format!("<html {html:?}>"),
        InlineNode::Emphasis(children) => format!("*[{}]*", inlines(children)),
        InlineNode::Strong(children) => format!("**[{}]**", inlines(children)),
        InlineNode::Strikethrough(children) => format!("~~[{}]~~", inlines(children)),
        InlineNode::Link {
            destination,
            children,
        } => format!("[{}]({destination})", inlines(children)),
        InlineNode::Image { source, alt } => format!("![{}]({source})", inlines(alt)),
        InlineNode::Math { source, identifier } => {
            let id = placeholder::identifier(identifier).unwrap_or_else(|| "?".into());
            format!("${source}$#{id}")
        }
    }
}
