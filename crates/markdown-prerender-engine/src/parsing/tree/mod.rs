//! # Document Tree
//!
//! Owned sum-type tree shared by every pipeline stage.
//!
//! ## Modules
//!
//! - **`types`**: `BlockNode`, `InlineNode` and their item/row/cell payloads
//! - **`builder`**: `TreeBuilder` folding `pulldown-cmark` events into a raw tree
//!
//! Each stage consumes a tree and returns a rebuilt one; nothing is shared
//! or mutated in place across stages.

pub mod builder;
pub mod types;

pub use builder::{TreeBuilder, build_tree, parser_options};
pub use types::{
    BlockNode, ColumnAlignment, InlineNode, ListItem, TableCell, TableRow, TaskListItem, plain_text,
};
