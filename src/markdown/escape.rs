//! Markdown escaping and code-span helpers.

/// Escape characters that would otherwise start Markdown syntax.
///
/// Inline markers (`\`, `*`, `_`, `` ` ``, `[`, `]`) are always escaped, and
/// `<` only when it could open a tag. Block markers (`#`, `>`, `-`/`+`
/// bullets, `1.` list numbers) are escaped only when `at_line_start` is set
/// or they follow a newline.
///
/// # Examples
///
/// ```
/// use epub2md::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*", false), "\\*bold\\*");
/// assert_eq!(escape_markdown("# not a heading", true), "\\# not a heading");
/// assert_eq!(escape_markdown("a # b", false), "a # b");
/// ```
pub fn escape_markdown(text: &str, at_line_start: bool) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut line_start = at_line_start;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);

        if line_start && c.is_ascii_digit() {
            let digits = text[i..]
                .find(|ch: char| !ch.is_ascii_digit())
                .unwrap_or(text.len() - i);
            let rest = &text[i + digits..];
            if rest.starts_with(". ") || rest == "." {
                out.push_str(&text[i..i + digits]);
                out.push_str("\\.");
                for _ in 0..digits {
                    chars.next();
                }
                line_start = false;
                continue;
            }
        }

        match c {
            '\\' | '*' | '_' | '`' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            '<' if next.is_some_and(|n| n.is_ascii_alphabetic() || n == '/' || n == '!') => {
                out.push_str("\\<");
            }
            '#' | '>' if line_start => {
                out.push('\\');
                out.push(c);
            }
            '-' | '+' if line_start && matches!(next, Some(' ') | None) => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }

        line_start = c == '\n';
    }

    out
}

/// Length of the longest run of `ch` in `content`.
pub fn longest_run(content: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Backtick fence for a code block, at least three long and longer than any
/// run inside `content`.
pub fn code_fence(content: &str) -> String {
    "`".repeat(longest_run(content, '`').max(2) + 1)
}

/// Wrap `content` in an inline code span.
///
/// Uses one more backtick than the longest run in the content, and pads with
/// spaces when the content itself starts or ends with a backtick.
///
/// ```
/// use epub2md::markdown::code_span;
///
/// assert_eq!(code_span("x"), "`x`");
/// assert_eq!(code_span("a`b"), "``a`b``");
/// assert_eq!(code_span("`"), "`` ` ``");
/// ```
pub fn code_span(content: &str) -> String {
    let ticks = "`".repeat(longest_run(content, '`') + 1);
    if content.starts_with('`') || content.ends_with('`') {
        format!("{ticks} {content} {ticks}")
    } else {
        format!("{ticks}{content}{ticks}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_inline_markers() {
        assert_eq!(escape_markdown("a\\b", false), "a\\\\b");
        assert_eq!(escape_markdown("_it_ and *b*", false), "\\_it\\_ and \\*b\\*");
        assert_eq!(escape_markdown("[x]", false), "\\[x\\]");
        assert_eq!(escape_markdown("`c`", false), "\\`c\\`");
    }

    #[test]
    fn test_escape_angle_bracket_only_before_tag() {
        assert_eq!(escape_markdown("<div>", false), "\\<div>");
        assert_eq!(escape_markdown("</p>", false), "\\</p>");
        assert_eq!(escape_markdown("a < b > c", false), "a < b > c");
    }

    #[test]
    fn test_escape_block_markers_at_line_start() {
        assert_eq!(escape_markdown("# h", true), "\\# h");
        assert_eq!(escape_markdown("> q", true), "\\> q");
        assert_eq!(escape_markdown("- item", true), "\\- item");
        assert_eq!(escape_markdown("+ item", true), "\\+ item");
        assert_eq!(escape_markdown("1984. A year", true), "1984\\. A year");
        assert_eq!(escape_markdown("line\n# h", false), "line\n\\# h");
    }

    #[test]
    fn test_block_markers_mid_line_untouched() {
        assert_eq!(escape_markdown("# h", false), "# h");
        assert_eq!(escape_markdown("a - b", false), "a - b");
        assert_eq!(escape_markdown("-dash", true), "-dash");
        assert_eq!(escape_markdown("1984 was", true), "1984 was");
        assert_eq!(escape_markdown("in 1984. Then", false), "in 1984. Then");
    }

    #[test]
    fn test_code_fence() {
        assert_eq!(code_fence("let x = 1;"), "```");
        assert_eq!(code_fence("``"), "```");
        assert_eq!(code_fence("```rust\n```"), "````");
    }

    #[test]
    fn test_code_span() {
        assert_eq!(code_span("plain"), "`plain`");
        assert_eq!(code_span("a``b"), "```a``b```");
        assert_eq!(code_span("`tick"), "`` `tick ``");
    }
}
