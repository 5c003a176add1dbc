pub mod highlight;
pub mod parsing;

// Re-export key types for easier usage
pub use highlight::{
    CacheState, CallerId, Colorizer, HighlightCache, HighlightCacheConfig, HighlightError,
    HighlightMap, HighlightOutcome, HighlightSpan, Lookup, Rgba, Submission, SyntectColorizer,
    TaskId,
};
pub use parsing::{
    CodeBlockRef, MarkdownParser, ParseResult,
    math::{MathEntry, MathTable},
    parse,
    ranges::{RootBlockKind, RootBlockRange, parse_block_ranges},
    tree::{BlockNode, ColumnAlignment, InlineNode, ListItem, TableCell, TableRow, TaskListItem},
};
