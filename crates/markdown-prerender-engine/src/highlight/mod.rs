//! # Incremental Syntax Highlighting
//!
//! Colors code-block content off the calling thread and reuses earlier work
//! while a block is still streaming in.
//!
//! ## Modules
//!
//! - **`cache`**: bucketed render cache with prefix lookup and global eviction
//! - **`colorizer`**: the `Colorizer` seam and its `syntect` implementation
//! - **`worker`**: `HighlightCache`, the request queue and its worker thread
//!
//! ## Lookup
//!
//! Entries are bucketed by language plus the first few characters of the
//! content. A query either matches an entry exactly ([`Lookup::Full`]),
//! shares a prefix with one ([`Lookup::Prefix`], map clipped to the shared
//! part) or misses ([`Lookup::None`]). Only `Full` is final; the other two
//! schedule a computation.

pub mod cache;
pub mod colorizer;
pub mod worker;

pub use cache::{HighlightCacheConfig, RenderCache};
pub use colorizer::{Colorizer, DEFAULT_THEME, SyntectColorizer};
pub use worker::HighlightCache;

use std::{
    fmt,
    hash::Hash,
    ops::Range,
};

use serde::Serialize;
use siphasher::sip128::{Hasher128, SipHasher13};
use thiserror::Error;

/// An sRGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// One colored run. `range` is in bytes of the highlighted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub range: Range<usize>,
    pub color: Rgba,
}

/// Colored runs sorted by start, non-overlapping, adjacent equal colors merged.
pub type HighlightMap = Vec<HighlightSpan>;

/// Sorts `spans` and merges touching runs of the same color. Empty runs are dropped.
pub fn normalize_spans(mut spans: Vec<HighlightSpan>) -> HighlightMap {
    spans.retain(|span| span.range.start < span.range.end);
    spans.sort_by_key(|span| span.range.start);

    let mut out: HighlightMap = Vec::with_capacity(spans.len());
    for span in spans {
        match out.last_mut() {
            Some(last) if last.color == span.color && last.range.end == span.range.start => {
                last.range.end = span.range.end;
            }
            _ => out.push(span),
        }
    }
    out
}

/// The part of `map` that lies before `boundary`. Spans starting at or past
/// the boundary are dropped, spans crossing it are cut short.
pub fn clip_map(map: &[HighlightSpan], boundary: usize) -> HighlightMap {
    map.iter()
        .filter(|span| span.range.start < boundary)
        .map(|span| HighlightSpan {
            range: span.range.start..span.range.end.min(boundary),
            color: span.color,
        })
        .collect()
}

/// Splits `content` into runs carrying the color that applies to them.
///
/// Spans that fall outside `content` or off a character boundary are ignored,
/// so a map computed for other content never panics here.
pub fn segments<'a>(map: &[HighlightSpan], content: &'a str) -> Vec<(&'a str, Option<Rgba>)> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for span in map {
        let Range { start, end } = span.range;
        if start < cursor
            || end > content.len()
            || !content.is_char_boundary(start)
            || !content.is_char_boundary(end)
        {
            continue;
        }
        if start > cursor {
            out.push((&content[cursor..start], None));
        }
        out.push((&content[start..end], Some(span.color)));
        cursor = end;
    }
    if cursor < content.len() {
        out.push((&content[cursor..], None));
    }
    out
}

/// Result of a synchronous cache probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The exact content is cached; the map is final.
    Full(HighlightMap),
    /// A related entry shares a prefix with the content; the map covers that
    /// prefix only.
    Prefix(HighlightMap),
    None,
}

impl Lookup {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Lookup::Full(_) => "full",
            Lookup::Prefix(_) => "prefix",
            Lookup::None => "none",
        }
    }

    pub fn map(&self) -> Option<&HighlightMap> {
        match self {
            Lookup::Full(map) | Lookup::Prefix(map) => Some(map),
            Lookup::None => None,
        }
    }
}

/// What a completion callback receives.
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightOutcome {
    Success(HighlightMap),
    /// A newer submit for the same caller superseded this request.
    Cancelled,
    Error(HighlightError),
}

impl HighlightOutcome {
    pub fn kind_name(&self) -> &'static str {
        match self {
            HighlightOutcome::Success(_) => "success",
            HighlightOutcome::Cancelled => "cancelled",
            HighlightOutcome::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HighlightError {
    #[error("Unknown highlight theme: {0}")]
    UnknownTheme(String),

    #[error("Failed to load themes from {path}: {message}")]
    ThemeFolder { path: String, message: String },

    #[error("Syntax highlighting failed: {0}")]
    Syntax(String),

    #[error("Colorizer failed: {0}")]
    Colorizer(String),
}

impl From<syntect::Error> for HighlightError {
    fn from(err: syntect::Error) -> Self {
        HighlightError::Syntax(err.to_string())
    }
}

/// Identifies whoever submits requests, typically one code block view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CallerId(pub u64);

/// Identifies one scheduled computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caller#{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Immediate answer to [`HighlightCache::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub lookup: Lookup,
    /// Set when a computation was scheduled; its outcome goes to the callback.
    pub task: Option<TaskId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Idle,
    Processing,
}

/// Stable 128-bit key of `content` in `language`. Language matching is
/// case-insensitive.
pub fn key(content: &str, language: &str) -> u128 {
    hash128(&(content, language.to_lowercase()))
}

pub(crate) fn hash128<T: Hash + ?Sized>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);
    const BLUE: Rgba = Rgba::new(0, 0, 255, 255);

    fn span(range: Range<usize>, color: Rgba) -> HighlightSpan {
        HighlightSpan { range, color }
    }

    #[test]
    fn key_ignores_language_case() {
        assert_eq!(key("fn main", "Rust"), key("fn main", "rust"));
        assert_ne!(key("fn main", "rust"), key("fn main", "python"));
        assert_ne!(key("fn main", "rust"), key("fn mai", "rust"));
    }

    #[test]
    fn lookup_map_is_absent_only_on_miss() {
        let map = vec![span(0..2, RED)];
        assert_eq!(Lookup::Full(map.clone()).map(), Some(&map));
        assert_eq!(Lookup::Prefix(map.clone()).map(), Some(&map));
        assert_eq!(Lookup::None.map(), None);
    }

    #[test]
    fn normalize_merges_and_sorts() {
        let spans = vec![
            span(4..6, BLUE),
            span(0..2, RED),
            span(2..4, RED),
            span(6..6, RED),
        ];
        assert_eq!(
            normalize_spans(spans),
            vec![span(0..4, RED), span(4..6, BLUE)]
        );
    }

    #[test]
    fn clip_drops_and_clamps() {
        let map = vec![span(0..3, RED), span(3..8, BLUE), span(8..10, RED)];
        assert_eq!(clip_map(&map, 5), vec![span(0..3, RED), span(3..5, BLUE)]);
        assert_eq!(clip_map(&map, 0), vec![]);
    }

    #[test]
    fn segments_cover_content() {
        let map = vec![span(0..2, RED), span(3..5, BLUE), span(4..99, RED)];
        assert_eq!(
            segments(&map, "let x"),
            vec![("le", Some(RED)), ("t", None), (" x", Some(BLUE))]
        );
    }

    #[test]
    fn color_display() {
        assert_eq!(Rgba::new(0x2b, 0x30, 0x3b, 0xff).to_string(), "#2b303b");
        assert_eq!(Rgba::new(1, 2, 3, 4).to_string(), "#01020304");
    }
}
