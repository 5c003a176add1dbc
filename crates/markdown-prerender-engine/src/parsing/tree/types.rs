use serde::Serialize;

/// A block-level node of the document tree.
///
/// The same type is used for the raw tree produced by the block parser and
/// for the normalized tree handed to renderers; the normalizer only changes
/// *where* nodes sit, never what a node means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BlockNode {
    /// ATX or setext heading, `level` in `1..=6`.
    Heading {
        level: u8,
        content: Vec<InlineNode>,
    },
    Paragraph {
        content: Vec<InlineNode>,
    },
    BulletedList {
        tight: bool,
        items: Vec<ListItem>,
    },
    NumberedList {
        tight: bool,
        start: u64,
        items: Vec<ListItem>,
    },
    TaskList {
        tight: bool,
        items: Vec<TaskListItem>,
    },
    /// After normalization, `children` holds paragraphs only.
    Blockquote {
        children: Vec<BlockNode>,
    },
    /// Fenced or indented code. `content` is the raw text, trailing newline included.
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    /// A GFM table. The header row is `rows[0]`.
    Table {
        alignments: Vec<ColumnAlignment>,
        rows: Vec<TableRow>,
    },
    ThematicBreak,
}

impl BlockNode {
    /// Convenience constructor for a paragraph holding a single text run.
    pub fn text_paragraph(text: impl Into<String>) -> Self {
        BlockNode::Paragraph {
            content: vec![InlineNode::Text(text.into())],
        }
    }

    /// Block kinds that may not stay nested inside a list item.
    pub fn is_liftable(&self) -> bool {
        matches!(
            self,
            BlockNode::Table { .. }
                | BlockNode::CodeBlock { .. }
                | BlockNode::Heading { .. }
                | BlockNode::ThematicBreak
                | BlockNode::Blockquote { .. }
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            BlockNode::BulletedList { .. } | BlockNode::NumberedList { .. } | BlockNode::TaskList { .. }
        )
    }

    /// Short name used in logs and outlines.
    pub fn kind_name(&self) -> &'static str {
        match self {
            BlockNode::Heading { .. } => "Heading",
            BlockNode::Paragraph { .. } => "Paragraph",
            BlockNode::BulletedList { .. } => "BulletedList",
            BlockNode::NumberedList { .. } => "NumberedList",
            BlockNode::TaskList { .. } => "TaskList",
            BlockNode::Blockquote { .. } => "Blockquote",
            BlockNode::CodeBlock { .. } => "CodeBlock",
            BlockNode::Table { .. } => "Table",
            BlockNode::ThematicBreak => "ThematicBreak",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListItem {
    pub children: Vec<BlockNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskListItem {
    pub done: bool,
    pub children: Vec<BlockNode>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ColumnAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl From<pulldown_cmark::Alignment> for ColumnAlignment {
    fn from(alignment: pulldown_cmark::Alignment) -> Self {
        match alignment {
            pulldown_cmark::Alignment::None => ColumnAlignment::None,
            pulldown_cmark::Alignment::Left => ColumnAlignment::Left,
            pulldown_cmark::Alignment::Center => ColumnAlignment::Center,
            pulldown_cmark::Alignment::Right => ColumnAlignment::Right,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableCell {
    pub content: Vec<InlineNode>,
}

/// An inline node inside a paragraph, heading or table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InlineNode {
    Text(String),
    SoftBreak,
    LineBreak,
    /// Inline code span contents, without the backticks.
    Code(String),
    Html(String),
    Emphasis(Vec<InlineNode>),
    Strong(Vec<InlineNode>),
    Strikethrough(Vec<InlineNode>),
    Link {
        destination: String,
        children: Vec<InlineNode>,
    },
    Image {
        source: String,
        alt: Vec<InlineNode>,
    },
    /// Resolved math span. Only produced by the finalizer.
    Math {
        /// Math source with its delimiters stripped.
        source: String,
        /// The placeholder token this node replaced, used to key rendered attachments.
        identifier: String,
    },
}

/// Concatenated plain text of an inline run.
pub fn plain_text(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        push_plain_text(node, &mut out);
    }
    out
}

fn push_plain_text(node: &InlineNode, out: &mut String) {
    match node {
        InlineNode::Text(text) | InlineNode::Code(text) | InlineNode::Html(text) => {
            out.push_str(text)
        }
        InlineNode::SoftBreak => out.push(' '),
        InlineNode::LineBreak => out.push('\n'),
        InlineNode::Emphasis(children)
        | InlineNode::Strong(children)
        | InlineNode::Strikethrough(children)
        | InlineNode::Link { children, .. }
        | InlineNode::Image { alt: children, .. } => {
            for child in children {
                push_plain_text(child, out);
            }
        }
        InlineNode::Math { source, .. } => out.push_str(source),
    }
}
