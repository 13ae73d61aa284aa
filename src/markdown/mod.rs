//! HTML → Markdown conversion.
//!
//! - [`escape`]: pure string helpers for escaping and code spans
//! - [`render`]: the default DOM walker, [`HtmlToMarkdown`]
//!
//! Rendering is driven by a [`TagPolicy`]: tags listed in
//! [`TagPolicy::preserve`] are emitted as raw HTML, and tags the renderer does
//! not know are handled according to [`UnknownTags`].

mod escape;
mod render;

pub use escape::{code_fence, code_span, escape_markdown, longest_run};
pub use render::HtmlToMarkdown;

use crate::dom::{Dom, parse_html};

/// Converts a parsed chapter into Markdown text.
pub trait MarkdownRenderer {
    /// Render the whole document. The result has no leading or trailing
    /// blank lines.
    fn render(&self, dom: &Dom, policy: &TagPolicy) -> String;
}

/// What to do with an element the renderer has no rule for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTags {
    /// Emit the element's original markup verbatim.
    #[default]
    PassThrough,
    /// Emit nothing for the element or its subtree.
    Drop,
    /// Render the element's children as if the element were absent.
    Bypass,
}

/// Tag handling rules for a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicy {
    /// Tags kept as raw HTML in the output.
    pub preserve: Vec<String>,
    pub unknown: UnknownTags,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            preserve: vec!["img".into(), "video".into(), "audio".into()],
            unknown: UnknownTags::PassThrough,
        }
    }
}

impl TagPolicy {
    /// Policy that preserves nothing and renders every image as Markdown.
    pub fn markdown_only() -> Self {
        Self {
            preserve: Vec::new(),
            ..Default::default()
        }
    }

    pub fn with_preserved<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preserve = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unknown(mut self, unknown: UnknownTags) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn preserves(&self, tag: &str) -> bool {
        self.preserve.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Parse `markup` and render it with [`HtmlToMarkdown`].
///
/// ```
/// use epub2md::markdown::{TagPolicy, render_html};
///
/// let md = render_html("<h1>Title</h1><p>Some <em>text</em>.</p>", &TagPolicy::default());
/// assert_eq!(md, "# Title\n\nSome _text_.");
/// ```
pub fn render_html(markup: &str, policy: &TagPolicy) -> String {
    HtmlToMarkdown.render(&parse_html(markup), policy)
}

/// Collapse every run of three or more newlines into exactly two.
///
/// ```
/// use epub2md::markdown::normalize_blank_lines;
///
/// assert_eq!(normalize_blank_lines("a\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
/// ```
pub fn normalize_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}
