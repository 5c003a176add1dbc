use std::sync::OnceLock;

use regex::Regex;

use super::{MathTable, extract::longest_group};
use crate::parsing::{placeholder, tree::InlineNode};

/// Inline delimiters only, single line, no backticks.
const INLINE_PATTERNS: [&str; 2] = [
    r"\\\(([^\n`]+?)\\\)", // \( ... \)
    r"\$([^\n`$]+?)\$",    // $ ... $
];

fn inline_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&INLINE_PATTERNS.join("|"))
                .map_err(|err| log::error!("failed to compile inline math pattern: {err}"))
                .ok()
        })
        .as_ref()
}

/// Splits a parsed text run into text and math nodes.
///
/// Math found here gets fresh indices appended to `math`. Text between
/// matches is kept verbatim; empty segments are not emitted.
pub fn sweep(text: &str, math: &mut MathTable) -> Vec<InlineNode> {
    let Some(regex) = inline_pattern() else {
        return vec![InlineNode::Text(text.to_string())];
    };

    let mut out = Vec::new();
    let mut cursor = 0;
    for caps in regex.captures_iter(text) {
        let (Some(whole), Some(content)) = (caps.get(0), longest_group(&caps)) else {
            continue;
        };
        if whole.start() > cursor {
            out.push(InlineNode::Text(text[cursor..whole.start()].to_string()));
        }
        let source = &text[content];
        let index = math.push(source, whole.as_str());
        out.push(InlineNode::Math {
            source: source.to_string(),
            identifier: placeholder::math_replacement(index),
        });
        cursor = whole.end();
    }

    if cursor < text.len() {
        out.push(InlineNode::Text(text[cursor..].to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text_is_untouched() {
        let mut math = MathTable::new();
        assert_eq!(
            sweep("no math here", &mut math),
            vec![InlineNode::Text("no math here".into())]
        );
        assert!(math.is_empty());
    }

    #[test]
    fn empty_text_yields_nothing() {
        let mut math = MathTable::new();
        assert!(sweep("", &mut math).is_empty());
    }

    #[test]
    fn splits_around_math() {
        let mut math = MathTable::new();
        math.push("existing", "$existing$");

        let nodes = sweep(r"area \(\pi r^2\) and $e$", &mut math);
        assert_eq!(
            nodes,
            vec![
                InlineNode::Text("area ".into()),
                InlineNode::Math {
                    source: r"\pi r^2".into(),
                    identifier: "`md://content?type=math&identifier=1`".into(),
                },
                InlineNode::Text(" and ".into()),
                InlineNode::Math {
                    source: "e".into(),
                    identifier: "`md://content?type=math&identifier=2`".into(),
                },
            ]
        );
        assert_eq!(math.len(), 3);
        assert_eq!(math.get(0), Some("existing"));
    }

    #[test]
    fn boundary_segments_are_omitted() {
        let mut math = MathTable::new();
        let nodes = sweep("$a$", &mut math);
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0], InlineNode::Math { .. }));
    }

    #[test]
    fn does_not_cross_lines() {
        let mut math = MathTable::new();
        let nodes = sweep("$a\nb$", &mut math);
        assert_eq!(nodes, vec![InlineNode::Text("$a\nb$".into())]);
        assert!(math.is_empty());
    }
}
