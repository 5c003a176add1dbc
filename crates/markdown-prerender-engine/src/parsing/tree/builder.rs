use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::types::{BlockNode, ColumnAlignment, InlineNode, ListItem, TableCell, TableRow, TaskListItem};
use crate::parsing::tagfilter::filter_tags;

/// Extension set the block parser always runs with.
pub fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Parses `text` into the raw block tree.
///
/// The result has the parser's own nesting: block content inside list items
/// and blockquotes is left where the grammar put it. See
/// [`crate::parsing::normalize`] for the repair pass.
pub fn build_tree(text: &str) -> Vec<BlockNode> {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(text, parser_options()) {
        builder.push(event);
    }
    builder.finish()
}

/// A list item under construction.
#[derive(Debug, Default)]
struct ItemDraft {
    task: Option<bool>,
    children: Vec<BlockNode>,
}

/// An open block container.
#[derive(Debug)]
enum BlockFrame {
    Root(Vec<BlockNode>),
    Quote(Vec<BlockNode>),
    List {
        start: Option<u64>,
        items: Vec<ItemDraft>,
        loose: bool,
    },
    Item(ItemDraft),
    Code {
        language: Option<String>,
        content: String,
    },
    Html(String),
    Table {
        alignments: Vec<ColumnAlignment>,
        rows: Vec<TableRow>,
    },
    Row(Vec<TableCell>),
}

/// What the currently open inline run will become once it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineOwner {
    Paragraph,
    Heading(u8),
    Cell,
    /// Text directly inside a tight list item, which has no paragraph events.
    ImplicitParagraph,
}

#[derive(Debug)]
enum InlineFrame {
    Root,
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
    Image(String),
}

#[derive(Debug)]
struct InlineLevel {
    frame: InlineFrame,
    children: Vec<InlineNode>,
}

/// Folds a `pulldown-cmark` event stream into a [`BlockNode`] tree.
///
/// Two stacks: one of open block containers, one of open inline spans for
/// the inline run currently being filled.
pub struct TreeBuilder {
    blocks: Vec<BlockFrame>,
    inlines: Vec<InlineLevel>,
    owner: Option<InlineOwner>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            blocks: vec![BlockFrame::Root(Vec::new())],
            inlines: Vec::new(),
            owner: None,
        }
    }

    pub fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.blocks.last_mut() {
                Some(BlockFrame::Code { content, .. }) => content.push_str(&text),
                Some(BlockFrame::Html(html)) => html.push_str(&text),
                _ => self.push_inline(InlineNode::Text(text.into_string())),
            },
            Event::Code(code) => self.push_inline(InlineNode::Code(code.into_string())),
            Event::Html(html) => match self.blocks.last_mut() {
                Some(BlockFrame::Html(block)) => block.push_str(&html),
                _ => self.push_inline(InlineNode::Html(filter_tags(&html).into_owned())),
            },
            Event::InlineHtml(html) => {
                self.push_inline(InlineNode::Html(filter_tags(&html).into_owned()))
            }
            Event::InlineMath(math) => self.push_inline(InlineNode::Text(format!("${math}$"))),
            Event::DisplayMath(math) => self.push_inline(InlineNode::Text(format!("$${math}$$"))),
            Event::FootnoteReference(label) => {
                self.push_inline(InlineNode::Text(format!("[^{label}]")))
            }
            Event::SoftBreak => self.push_inline(InlineNode::SoftBreak),
            Event::HardBreak => self.push_inline(InlineNode::LineBreak),
            Event::Rule => {
                self.flush_implicit();
                self.push_block(BlockNode::ThematicBreak);
            }
            Event::TaskListMarker(done) => {
                if let Some(item) = self.blocks.iter_mut().rev().find_map(|frame| match frame {
                    BlockFrame::Item(item) => Some(item),
                    _ => None,
                }) {
                    item.task = Some(done);
                }
            }
        }
    }

    pub fn finish(mut self) -> Vec<BlockNode> {
        while self.blocks.len() > 1 {
            self.pop_frame();
        }
        self.flush_implicit();
        match self.blocks.pop() {
            Some(BlockFrame::Root(nodes)) => nodes,
            _ => Vec::new(),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.flush_implicit();
                self.mark_enclosing_list_loose();
                self.open_inline(InlineOwner::Paragraph);
            }
            Tag::Heading { level, .. } => {
                self.flush_implicit();
                self.open_inline(InlineOwner::Heading(heading_level_to_u8(level)));
            }
            Tag::BlockQuote(_) => self.open_block(BlockFrame::Quote(Vec::new())),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.open_block(BlockFrame::Code {
                    language,
                    content: String::new(),
                });
            }
            Tag::HtmlBlock => self.open_block(BlockFrame::Html(String::new())),
            Tag::List(start) => self.open_block(BlockFrame::List {
                start,
                items: Vec::new(),
                loose: false,
            }),
            Tag::Item => self.open_block(BlockFrame::Item(ItemDraft::default())),
            Tag::Table(alignments) => self.open_block(BlockFrame::Table {
                alignments: alignments.into_iter().map(ColumnAlignment::from).collect(),
                rows: Vec::new(),
            }),
            Tag::TableHead | Tag::TableRow => self.open_block(BlockFrame::Row(Vec::new())),
            Tag::TableCell => self.open_inline(InlineOwner::Cell),
            Tag::Emphasis => self.open_span(InlineFrame::Emphasis),
            Tag::Strong => self.open_span(InlineFrame::Strong),
            Tag::Strikethrough => self.open_span(InlineFrame::Strikethrough),
            Tag::Link { dest_url, .. } => self.open_span(InlineFrame::Link(dest_url.into_string())),
            Tag::Image { dest_url, .. } => self.open_span(InlineFrame::Image(dest_url.into_string())),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                let content = self.close_inline();
                self.push_block(BlockNode::Paragraph { content });
            }
            TagEnd::Heading(level) => {
                let content = self.close_inline();
                self.push_block(BlockNode::Heading {
                    level: heading_level_to_u8(level),
                    content,
                });
            }
            TagEnd::TableCell => {
                let content = self.close_inline();
                if let Some(BlockFrame::Row(cells)) = self.blocks.last_mut() {
                    cells.push(TableCell { content });
                }
            }
            TagEnd::BlockQuote(_)
            | TagEnd::CodeBlock
            | TagEnd::HtmlBlock
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::Table
            | TagEnd::TableHead
            | TagEnd::TableRow => self.pop_frame(),
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image => self.close_span(),
            _ => {}
        }
    }

    fn open_block(&mut self, frame: BlockFrame) {
        self.flush_implicit();
        self.blocks.push(frame);
    }

    /// Closes the innermost block container and hands its node to the parent.
    fn pop_frame(&mut self) {
        if self.blocks.len() <= 1 {
            debug_assert!(false, "unbalanced block end event");
            return;
        }
        self.flush_implicit();
        let Some(frame) = self.blocks.pop() else {
            return;
        };

        match frame {
            BlockFrame::Root(nodes) => self.blocks.push(BlockFrame::Root(nodes)),
            BlockFrame::Quote(children) => self.push_block(BlockNode::Blockquote { children }),
            BlockFrame::List {
                start,
                items,
                loose,
            } => self.push_block(list_node(start, items, !loose)),
            BlockFrame::Item(item) => match self.blocks.last_mut() {
                Some(BlockFrame::List { items, .. }) => items.push(item),
                _ => {
                    for child in item.children {
                        self.push_block(child);
                    }
                }
            },
            BlockFrame::Code { language, content } => {
                self.push_block(BlockNode::CodeBlock { language, content })
            }
            BlockFrame::Html(html) => {
                if !html.trim().is_empty() {
                    self.push_block(BlockNode::Paragraph {
                        content: vec![InlineNode::Html(filter_tags(&html).into_owned())],
                    });
                }
            }
            BlockFrame::Table { alignments, rows } => {
                self.push_block(BlockNode::Table { alignments, rows })
            }
            BlockFrame::Row(cells) => {
                if let Some(BlockFrame::Table { rows, .. }) = self.blocks.last_mut() {
                    rows.push(TableRow { cells });
                }
            }
        }
    }

    fn push_block(&mut self, node: BlockNode) {
        match self.blocks.last_mut() {
            Some(BlockFrame::Root(nodes) | BlockFrame::Quote(nodes)) => nodes.push(node),
            Some(BlockFrame::Item(item)) => item.children.push(node),
            other => {
                log::warn!(
                    "dropping {} emitted inside {:?}",
                    node.kind_name(),
                    other.map(|frame| frame_name(frame))
                );
            }
        }
    }

    fn mark_enclosing_list_loose(&mut self) {
        let depth = self.blocks.len();
        if depth < 2 || !matches!(self.blocks[depth - 1], BlockFrame::Item(_)) {
            return;
        }
        if let BlockFrame::List { loose, .. } = &mut self.blocks[depth - 2] {
            *loose = true;
        }
    }

    fn open_inline(&mut self, owner: InlineOwner) {
        self.owner = Some(owner);
        self.inlines = vec![InlineLevel {
            frame: InlineFrame::Root,
            children: Vec::new(),
        }];
    }

    /// Closes the open inline run, folding any spans left open into it.
    fn close_inline(&mut self) -> Vec<InlineNode> {
        while self.inlines.len() > 1 {
            self.close_span();
        }
        self.owner = None;
        self.inlines.pop().map(|level| level.children).unwrap_or_default()
    }

    /// Turns a pending tight-item text run into a paragraph.
    fn flush_implicit(&mut self) {
        if self.owner == Some(InlineOwner::ImplicitParagraph) {
            let content = self.close_inline();
            if !content.is_empty() {
                self.push_block(BlockNode::Paragraph { content });
            }
        }
    }

    fn ensure_inline_root(&mut self) {
        if self.inlines.is_empty() {
            self.open_inline(InlineOwner::ImplicitParagraph);
        }
    }

    fn open_span(&mut self, frame: InlineFrame) {
        self.ensure_inline_root();
        self.inlines.push(InlineLevel {
            frame,
            children: Vec::new(),
        });
    }

    fn close_span(&mut self) {
        if self.inlines.len() <= 1 {
            return;
        }
        let Some(level) = self.inlines.pop() else {
            return;
        };
        let node = match level.frame {
            InlineFrame::Root => return,
            InlineFrame::Emphasis => InlineNode::Emphasis(level.children),
            InlineFrame::Strong => InlineNode::Strong(level.children),
            InlineFrame::Strikethrough => InlineNode::Strikethrough(level.children),
            InlineFrame::Link(destination) => InlineNode::Link {
                destination,
                children: level.children,
            },
            InlineFrame::Image(source) => InlineNode::Image {
                source,
                alt: level.children,
            },
        };
        self.push_inline(node);
    }

    fn push_inline(&mut self, node: InlineNode) {
        self.ensure_inline_root();
        let Some(level) = self.inlines.last_mut() else {
            return;
        };
        match (level.children.last_mut(), node) {
            (Some(InlineNode::Text(previous)), InlineNode::Text(text)) => previous.push_str(&text),
            (_, node) => level.children.push(node),
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn list_node(start: Option<u64>, items: Vec<ItemDraft>, tight: bool) -> BlockNode {
    if items.iter().any(|item| item.task.is_some()) {
        return BlockNode::TaskList {
            tight,
            items: items
                .into_iter()
                .map(|item| TaskListItem {
                    done: item.task.unwrap_or(false),
                    children: item.children,
                })
                .collect(),
        };
    }

    let items = items
        .into_iter()
        .map(|item| ListItem {
            children: item.children,
        })
        .collect();
    match start {
        Some(start) => BlockNode::NumberedList { tight, start, items },
        None => BlockNode::BulletedList { tight, items },
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn frame_name(frame: &BlockFrame) -> &'static str {
    match frame {
        BlockFrame::Root(_) => "root",
        BlockFrame::Quote(_) => "blockquote",
        BlockFrame::List { .. } => "list",
        BlockFrame::Item(_) => "item",
        BlockFrame::Code { .. } => "code block",
        BlockFrame::Html(_) => "html block",
        BlockFrame::Table { .. } => "table",
        BlockFrame::Row(_) => "table row",
    }
}
