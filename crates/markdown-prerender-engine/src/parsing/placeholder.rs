//! # Placeholder Tokens
//!
//! Extracted spans are replaced in the source text by an inert token that the
//! block parser sees as an ordinary inline code span:
//!
//! ```text
//! `md://content?type=math&identifier=3`
//! ```
//!
//! The token is built from URL-safe characters only, so it never opens
//! emphasis, never splits a table cell and never overlaps a math delimiter.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Scheme and host every token starts with.
pub const TOKEN_PREFIX: &str = "md://content";

const TICK: char = '`';

/// The kind of content a placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Math,
    Unknown,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Math => "math",
            ContentType::Unknown => "unknown",
        }
    }

    fn from_query_value(value: &str) -> Self {
        match value {
            "math" => ContentType::Math,
            _ => ContentType::Unknown,
        }
    }
}

/// Builds the backtick-wrapped token for `content_type` and `identifier`.
pub fn replacement_text(content_type: ContentType, identifier: &str) -> String {
    format!(
        "{TICK}{TOKEN_PREFIX}?type={}&identifier={identifier}{TICK}",
        content_type.as_str()
    )
}

/// Token text for a math table index.
pub fn math_replacement(index: usize) -> String {
    replacement_text(ContentType::Math, &index.to_string())
}

/// A token decoded back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub content_type: ContentType,
    pub identifier: String,
}

impl Placeholder {
    /// Decodes `text` as a token.
    ///
    /// With `strict` set the text must carry both enclosing backticks; otherwise
    /// any leading/trailing backticks are trimmed first (the block parser strips
    /// them from code spans).
    pub fn parse(text: &str, strict: bool) -> Option<Self> {
        if strict && !(text.starts_with(TICK) && text.ends_with(TICK) && text.len() >= 2) {
            return None;
        }
        let text = text.trim_matches(TICK).trim();
        if !text.starts_with(TOKEN_PREFIX) {
            return None;
        }
        let url = Url::parse(text).ok()?;

        let mut content_type = None;
        let mut identifier = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "type" => content_type = Some(ContentType::from_query_value(&value)),
                "identifier" => identifier = Some(value.into_owned()),
                _ => {}
            }
        }

        Some(Placeholder {
            content_type: content_type.unwrap_or(ContentType::Unknown),
            identifier: identifier.filter(|id| !id.is_empty())?,
        })
    }

    /// The math table index, when this is a math token with a numeric identifier.
    pub fn math_index(&self) -> Option<usize> {
        if self.content_type != ContentType::Math {
            return None;
        }
        self.identifier.parse().ok()
    }

    /// Re-encodes the token, backticks included.
    pub fn to_token(&self) -> String {
        replacement_text(self.content_type, &self.identifier)
    }
}

/// Content type of a token, [`ContentType::Unknown`] when `text` is not one.
pub fn content_type(text: &str) -> ContentType {
    Placeholder::parse(text, false)
        .map(|p| p.content_type)
        .unwrap_or(ContentType::Unknown)
}

/// Identifier carried by a token.
pub fn identifier(text: &str) -> Option<String> {
    Placeholder::parse(text, false).map(|p| p.identifier)
}

/// Matches math tokens embedded in verbatim text (code blocks, HTML, URLs).
///
/// The backtick pair is required, so user text that merely spells out a
/// token body is left alone. Backslash-escaped `?`/`&`/`=` and an
/// HTML-escaped `&amp;` are tolerated.
pub(crate) fn embedded_math_token_regex() -> Option<&'static Regex> {
    static EMBEDDED: OnceLock<Option<Regex>> = OnceLock::new();
    EMBEDDED
        .get_or_init(|| compile(&format!("`{TOKEN_BODY}`")))
        .as_ref()
}

/// Matches math tokens in text runs, where the block parser may have paired
/// the token's backticks with neighbouring ones and dropped them.
pub(crate) fn split_math_token_regex() -> Option<&'static Regex> {
    static SPLIT: OnceLock<Option<Regex>> = OnceLock::new();
    SPLIT
        .get_or_init(|| compile(&format!("`?{TOKEN_BODY}`?")))
        .as_ref()
}

const TOKEN_BODY: &str = r"md://content\\?\?type\\?=math(?:\\?&|&amp;)identifier\\?=([0-9]+)";

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|err| log::error!("failed to compile embedded placeholder pattern: {err}"))
        .ok()
}
