/// Markdown with math, lists holding code and tables, and a blockquote,
/// repeated to roughly `size_kb` kilobytes.
pub fn generate_markdown_content(size_kb: usize) -> String {
    let base = r#"## Subsection

A paragraph with inline math $a_i^2 + b_i^2$ and \(x_{n+1}\), plus a link to
https://example.com/docs for reference.

$$
\sum_{k=0}^{n} \binom{n}{k} = 2^n
$$

1. First step
2. Second step with code:

   ```rust
   fn example(value: u32) -> u32 {
       let cost = "$price";
       value * 2
   }
   ```

3. Third step

- [x] done
- [ ] pending

| name | formula |
|------|---------|
| area | $\pi r^2$ |

> Quoted text
> - with a list
> - inside

"#;

    let target_bytes = size_kb * 1024;
    let mut content = String::new();
    let mut section_num = 0;

    while content.len() < target_bytes {
        content.push_str(&format!("# Document Section {section_num}\n\n"));
        content.push_str(base);
        section_num += 1;
    }

    content
}
