//! Bare URL autolinking for text runs.
//!
//! The block parser only links `<https://...>` forms; GFM also links bare
//! `http(s)://` URLs, which is done here after finalization.

use std::sync::OnceLock;

use regex::Regex;

use super::tree::InlineNode;

fn url_pattern() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s<>\[\]]+").expect("Invalid URL regex"))
}

/// Splits `text` into text and link nodes. Returns `None` when `text` holds no URL.
pub fn autolink(text: &str) -> Option<Vec<InlineNode>> {
    let mut out = Vec::new();
    let mut cursor = 0;

    for url_match in url_pattern().find_iter(text) {
        let start = url_match.start();
        let end = start + trim_trailing_punctuation(url_match.as_str()).len();
        // Bare scheme with nothing after it is not a link.
        if end <= start + url_match.as_str().find("://").map_or(0, |i| i + 3) {
            continue;
        }

        if start > cursor {
            out.push(InlineNode::Text(text[cursor..start].to_string()));
        }
        let url = &text[start..end];
        out.push(InlineNode::Link {
            destination: url.to_string(),
            children: vec![InlineNode::Text(url.to_string())],
        });
        cursor = end;
    }

    if out.is_empty() {
        return None;
    }
    if cursor < text.len() {
        out.push(InlineNode::Text(text[cursor..].to_string()));
    }
    Some(out)
}

fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ':', ';', '!', '?', ')', ']', '}'])
}
