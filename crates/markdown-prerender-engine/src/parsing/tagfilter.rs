//! GFM tag filter: disables a fixed set of raw HTML tags by escaping their `<`.

use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;

const FILTERED_TAGS: [&str; 9] = [
    "title",
    "textarea",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "script",
    "plaintext",
];

fn filter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(r"(?i)<(/?(?:{}))(\s|/|>|$)", FILTERED_TAGS.join("|"));
        Regex::new(&pattern).expect("Invalid tag filter regex")
    })
}

/// Escapes the opening `<` of every filtered tag in `html`.
pub fn filter_tags(html: &str) -> Cow<'_, str> {
    filter_pattern().replace_all(html, "&lt;$1$2")
}
