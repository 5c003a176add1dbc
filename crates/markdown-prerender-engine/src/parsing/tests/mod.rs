//! Pipeline tests for the parsing module.
//!
//! Fixtures (.md) live in `fixtures/`; expected trees are inline outline
//! snapshots next to each test.


use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::parsing::{
    MarkdownParser, ParseResult,
    math::extract,
    parse,
    snapshot::{outline, violations},
    tree::{BlockNode, InlineNode, plain_text},
};

fn fixture(name: &str) -> String {
    let path = format!(
        "{}/src/parsing/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    );
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("reading {path}: {err}"))
}

/// Parses and checks the structural invariants before handing the result back.
fn parse_checked(markdown: &str) -> ParseResult {
    let result = parse(markdown);
    let found = violations(&result.document, &result.math);
    assert!(found.is_empty(), "invariant violations: {found:?}");
    result
}

fn kinds(blocks: &[BlockNode]) -> Vec<&'static str> {
    blocks.iter().map(BlockNode::kind_name).collect()
}

// Fixture-based tests

#[test]
fn fixture_list_with_code() {
    let result = parse_checked(&fixture("list_with_code"));
    insta::assert_snapshot!(outline(&result.document), @r#"
    BulletedList(tight)
      - Paragraph: "item1"
    CodeBlock(): "code\n"
    BulletedList(tight)
      - Paragraph: "item2"
    "#);
}

#[test]
fn fixture_numbered_with_table() {
    let result = parse_checked(&fixture("numbered_with_table"));
    assert_eq!(
        kinds(&result.document),
        vec!["BulletedList", "Table", "BulletedList"]
    );

    let single_item_text = |block: &BlockNode| match block {
        BlockNode::BulletedList { items, .. } => {
            assert_eq!(items.len(), 1);
            match &items[0].children[..] {
                [BlockNode::Paragraph { content }] => plain_text(content),
                other => panic!("unexpected item children {other:?}"),
            }
        }
        other => panic!("expected a list, got {other:?}"),
    };
    assert_eq!(single_item_text(&result.document[0]), "A");
    assert_eq!(single_item_text(&result.document[2]), "B");

    let BlockNode::Table { rows, .. } = &result.document[1] else {
        panic!("expected a table");
    };
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.cells.iter().map(|c| plain_text(&c.content)).collect())
        .collect();
    assert_eq!(cells, vec![vec!["a", "b"], vec!["1", "2"]]);
}

#[test]
fn fixture_blockquote_list() {
    let result = parse_checked(&fixture("blockquote_list"));
    assert_eq!(
        result.document,
        vec![BlockNode::Blockquote {
            children: vec![
                BlockNode::text_paragraph("one"),
                BlockNode::text_paragraph("two"),
            ],
        }]
    );
}

#[test]
fn fixture_mixed() {
    let result = parse_checked(&fixture("mixed"));
    insta::assert_snapshot!(outline(&result.document), @r#"
    Heading(1): "Title"
    Paragraph: "Intro with " $x^2$#0 " and " ["https://example.com"](https://example.com) "."
    TaskList(tight)
      [x] Paragraph: "shipped"
      [ ] Paragraph: "pending"
    Blockquote
      > Paragraph: "quoted " **["bold"]**
    "#);
    assert_eq!(result.math.len(), 1);
}

// Math

#[rstest]
#[case("plain text")]
#[case("$a$ and $b$")]
#[case(r"\[ x \] then \(y\) then $$z$$")]
#[case("```\n$code$\n```")]
fn re_extraction_finds_nothing(#[case] input: &str) {
    let once = extract(input);
    assert!(extract(&once.indexed).math.is_empty());
}

#[test]
fn math_in_code_block_is_restored_verbatim() {
    let result = parse_checked("```sh\necho $HOME$ and \\(x\\)\n```\n\nAnd $y$ outside.\n");

    assert_eq!(
        result.code_blocks()[0].content,
        "echo $HOME$ and \\(x\\)\n"
    );
    let BlockNode::Paragraph { content } = &result.document[1] else {
        panic!("expected a paragraph");
    };
    assert!(matches!(&content[1], InlineNode::Math { source, .. } if source == "y"));
}

#[test]
fn math_quoting_token_text_inside_code_block() {
    let input = "```\n$`md://content?type=math&identifier=0`$\n```\n";
    let result = parse_checked(input);

    assert_eq!(
        result.code_blocks()[0].content,
        "$`md://content?type=math&identifier=0`$\n"
    );
}

#[test]
fn token_body_typed_into_code_block_stays() {
    let result = parse_checked("```\nmd://content?type=math&identifier=0\n```\n\nAnd $x$.\n");
    assert_eq!(
        result.code_blocks()[0].content,
        "md://content?type=math&identifier=0\n"
    );
}

#[test]
fn dollar_pairs_inside_code_spans_render_as_math() {
    // Extraction runs before the block parser, so code spans do not shield
    // dollar-delimited text.
    let result = parse_checked("Run `$HOME$` now");
    let [BlockNode::Paragraph { content }] = result.document.as_slice() else {
        panic!("expected one paragraph");
    };
    assert_eq!(content[0], InlineNode::Text("Run ".into()));
    assert!(matches!(&content[1], InlineNode::Math { source, .. } if source == "HOME"));
    assert_eq!(plain_text(content), "Run HOME now");
}

#[test]
fn emphasis_characters_inside_math_survive() {
    let result = parse_checked("$a_1$ and $b_2$ with *real* emphasis");
    let BlockNode::Paragraph { content } = &result.document[0] else {
        panic!("expected a paragraph");
    };

    let math: Vec<&str> = content
        .iter()
        .filter_map(|node| match node {
            InlineNode::Math { source, .. } => Some(source.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(math, vec!["a_1", "b_2"]);
    assert!(content.iter().any(|n| matches!(n, InlineNode::Emphasis(_))));
}

#[test]
fn pipe_inside_math_does_not_split_cells() {
    let result = parse_checked("| a | b |\n|---|---|\n| $x|y$ | 2 |\n");
    let BlockNode::Table { rows, .. } = &result.document[0] else {
        panic!("expected a table");
    };
    assert_eq!(rows[1].cells.len(), 2);
    assert!(matches!(
        &rows[1].cells[0].content[..],
        [InlineNode::Math { source, .. }] if source == "x|y"
    ));
}

#[test]
fn math_identifiers_resolve_through_the_table() {
    let result = parse_checked("$p$, $q$ and \\(r\\)");
    let BlockNode::Paragraph { content } = &result.document[0] else {
        panic!("expected a paragraph");
    };
    let replacements: Vec<(String, &str)> = result.math.replacements().collect();

    for node in content {
        if let InlineNode::Math { source, identifier } = node {
            let found = replacements
                .iter()
                .find(|(token, _)| token == identifier)
                .map(|(_, source)| *source);
            assert_eq!(found, Some(source.as_str()));
        }
    }
    assert_eq!(result.math.len(), 3);
}

// Structure

#[test]
fn heading_in_list_item_is_lifted() {
    let result = parse_checked("- a\n  # H\n- b\n");
    assert_eq!(
        kinds(&result.document),
        vec!["BulletedList", "Heading", "BulletedList"]
    );
}

#[test]
fn unnormalized_parse_keeps_parser_nesting() {
    let markdown = "- a\n\n  ```\n  code\n  ```\n";
    let raw = MarkdownParser::new().with_normalize(false).parse(markdown);
    assert_eq!(kinds(&raw.document), vec!["BulletedList"]);
    assert_eq!(violations(&raw.document, &raw.math).len(), 1);

    let normalized = parse_checked(markdown);
    assert_eq!(kinds(&normalized.document), vec!["BulletedList", "CodeBlock"]);
}

#[test]
fn code_blocks_are_collected_in_order() {
    let result = parse_checked("```rust\nfn a() {}\n```\n\n- item\n\n  ```py\n  x = 1\n  ```\n");
    let blocks: Vec<_> = result
        .code_blocks()
        .into_iter()
        .map(|b| (b.language, b.content))
        .collect();
    assert_eq!(
        blocks,
        vec![(Some("rust"), "fn a() {}\n"), (Some("py"), "x = 1\n")]
    );
}

#[test]
fn disallowed_html_is_escaped() {
    let result = parse_checked("<script>alert(1)</script>\n");
    let BlockNode::Paragraph { content } = &result.document[0] else {
        panic!("expected a paragraph");
    };
    let [InlineNode::Html(html)] = &content[..] else {
        panic!("expected one html node, got {content:?}");
    };
    assert!(html.starts_with("&lt;script>"));
}

#[test]
fn bare_urls_are_linked() {
    let result = parse_checked("Visit https://example.com.");
    assert_eq!(
        result.document,
        vec![BlockNode::Paragraph {
            content: vec![
                InlineNode::Text("Visit ".into()),
                InlineNode::Link {
                    destination: "https://example.com".into(),
                    children: vec![InlineNode::Text("https://example.com".into())],
                },
                InlineNode::Text(".".into()),
            ],
        }]
    );
}

#[rstest]
#[case("")]
#[case("\n\n\n")]
fn empty_documents(#[case] input: &str) {
    let result = parse_checked(input);
    assert!(result.document.is_empty());
    assert!(result.math.is_empty());
}
