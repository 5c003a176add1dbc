use std::{ops::Range, sync::OnceLock};

use regex::{Captures, Regex};

use super::MathTable;
use crate::parsing::placeholder;

/// Document-level math delimiters, in priority order.
const DOCUMENT_PATTERNS: [&str; 4] = [
    r"\$\$([\s\S]*?)\$\$", // block math $$ ... $$
    r"\\\[([\s\S]*?)\\\]", // escaped block math \[ ... \]
    r"\\\(([\s\S]*?)\\\)", // escaped inline math \( ... \)
    r"\$([\s\S]*?)\$",     // inline math $ ... $
];

fn document_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&DOCUMENT_PATTERNS.join("|"))
                .map_err(|err| log::error!("failed to compile math pattern: {err}"))
                .ok()
        })
        .as_ref()
}

/// Result of the document-level math pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Source text with every math span replaced by a placeholder token.
    pub indexed: String,
    pub math: MathTable,
}

/// Replaces every math span in `raw` with a placeholder token.
///
/// Pure function of `raw`. If the pattern set is unavailable the text comes
/// back unchanged with an empty table.
pub fn extract(raw: &str) -> Extraction {
    let Some(regex) = document_pattern() else {
        return Extraction {
            indexed: raw.to_string(),
            math: MathTable::new(),
        };
    };

    let spans: Vec<(Range<usize>, Range<usize>)> = regex
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?.range();
            longest_group(&caps).map(|content| (whole, content))
        })
        .collect();

    if spans.is_empty() {
        return Extraction {
            indexed: raw.to_string(),
            math: MathTable::new(),
        };
    }

    // Indices run from the end of the document backwards; the output is still
    // assembled front to back in a single pass.
    let mut math = MathTable::new();
    let mut indices = vec![0; spans.len()];
    for (slot, (whole, content)) in spans.iter().enumerate().rev() {
        indices[slot] = math.push(&raw[content.clone()], &raw[whole.clone()]);
    }

    let mut indexed = String::with_capacity(raw.len() + spans.len() * 40);
    let mut cursor = 0;
    for ((whole, _), index) in spans.iter().zip(indices) {
        indexed.push_str(&raw[cursor..whole.start]);
        indexed.push_str(&placeholder::math_replacement(index));
        cursor = whole.end;
    }
    indexed.push_str(&raw[cursor..]);

    log::debug!("extracted {} math span(s)", math.len());
    Extraction { indexed, math }
}

/// The longest non-empty capture group of a match.
///
/// Alternatives are mutually exclusive in practice, but picking by length
/// keeps the choice deterministic if they ever overlap.
pub(super) fn longest_group(caps: &Captures<'_>) -> Option<Range<usize>> {
    caps.iter()
        .skip(1)
        .flatten()
        .filter(|m| !m.is_empty())
        .max_by_key(|m| m.len())
        .map(|m| m.range())
}
