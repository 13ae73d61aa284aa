//! DOM → Markdown rendering.
//!
//! The walker appends to a single output buffer. Block elements call
//! [`Writer::block_break`] before and after themselves; list items and block
//! quotes are rendered into a nested writer and then indented or prefixed
//! line by line.

use crate::dom::{Dom, NodeData, NodeId, outer_html};

use super::escape::{code_fence, code_span, escape_markdown};
use super::{MarkdownRenderer, TagPolicy, UnknownTags};

/// GitHub-flavored Markdown renderer over a [`Dom`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlToMarkdown;

impl MarkdownRenderer for HtmlToMarkdown {
    fn render(&self, dom: &Dom, policy: &TagPolicy) -> String {
        let mut writer = Writer::new(dom, policy, false);
        writer.children(dom.document());
        writer.finish()
    }
}

/// Elements whose subtree never reaches the output.
const DROPPED: &[&str] = &["head", "script", "style", "title", "template"];

/// Containers rendered as a block around their children.
const BLOCK_CONTAINERS: &[&str] = &[
    "html", "body", "div", "section", "article", "header", "footer", "main", "nav", "aside",
    "figure", "figcaption", "table", "thead", "tbody", "tfoot", "dl", "dt", "dd", "li",
    "center", "address", "details", "summary", "hgroup",
];

/// Elements rendered as their children, inline.
const INLINE_CONTAINERS: &[&str] = &[
    "span", "sup", "sub", "small", "u", "ins", "abbr", "cite", "q", "kbd", "mark", "time",
    "var", "samp", "font", "label", "bdi", "bdo", "big", "dfn",
];

struct Writer<'a> {
    dom: &'a Dom,
    policy: &'a TagPolicy,
    out: String,
    /// Separate blocks with a single newline instead of a blank line.
    tight: bool,
}

impl<'a> Writer<'a> {
    fn new(dom: &'a Dom, policy: &'a TagPolicy, tight: bool) -> Self {
        Self {
            dom,
            policy,
            out: String::new(),
            tight,
        }
    }

    fn finish(self) -> String {
        self.out.trim_matches(|c: char| c == '\n' || c == ' ').to_string()
    }

    fn nested(&self, id: NodeId, tight: bool) -> String {
        let mut writer = Writer::new(self.dom, self.policy, tight);
        writer.children(id);
        writer.finish()
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn trim_trailing_spaces(&mut self) {
        let kept = self.out.trim_end_matches([' ', '\t']).len();
        // A Markdown hard break is two spaces before a newline, so only the
        // spaces on the current, unfinished line are removed.
        self.out.truncate(kept);
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() {
            return;
        }
        let want = if self.tight { 1 } else { 2 };
        let have = self.out.len() - self.out.trim_end_matches('\n').len();
        for _ in have..want {
            self.out.push('\n');
        }
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn children(&mut self, id: NodeId) {
        let dom = self.dom;
        for child in dom.children(id) {
            self.node(child);
        }
    }

    fn node(&mut self, id: NodeId) {
        let dom = self.dom;
        let Some(node) = dom.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => self.children(id),
            NodeData::Text(text) => self.text(text),
            NodeData::Element { name, .. } => {
                let tag = name.local.as_ref();
                self.element(id, tag);
            }
            NodeData::Comment(_) | NodeData::Doctype { .. } => {}
        }
    }

    fn text(&mut self, text: &str) {
        let mut collapsed = String::with_capacity(text.len());
        let mut in_space = false;
        for c in text.chars() {
            if c.is_ascii_whitespace() {
                in_space = true;
            } else {
                if in_space {
                    collapsed.push(' ');
                    in_space = false;
                }
                collapsed.push(c);
            }
        }
        if in_space {
            collapsed.push(' ');
        }

        let mut chunk = collapsed.as_str();
        if self.at_line_start() || self.out.ends_with(' ') {
            chunk = chunk.trim_start_matches(' ');
        }
        if chunk.is_empty() {
            return;
        }

        let escaped = escape_markdown(chunk, self.at_line_start());
        self.out.push_str(&escaped);
    }

    fn element(&mut self, id: NodeId, tag: &str) {
        if self.policy.preserves(tag) {
            self.out.push_str(&outer_html(self.dom, id));
            return;
        }

        match tag {
            t if DROPPED.contains(&t) => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.heading(id, tag),
            "p" => {
                self.block_break();
                self.children(id);
                self.block_break();
            }
            "br" => {
                self.trim_trailing_spaces();
                self.out.push_str("  \n");
            }
            "hr" => {
                self.block_break();
                self.out.push_str("***");
                self.block_break();
            }
            "em" | "i" => self.wrapped(id, "_"),
            "strong" | "b" => self.wrapped(id, "**"),
            "del" | "s" | "strike" => self.wrapped(id, "~~"),
            "code" | "tt" => {
                let content = self.dom.text_content(id);
                if !content.is_empty() {
                    self.out.push_str(&code_span(&content));
                }
            }
            "pre" => self.code_block(id),
            "a" => self.link(id),
            "img" => self.image(id),
            "ul" => self.list(id, false),
            "ol" => self.list(id, true),
            "blockquote" => self.blockquote(id),
            "tr" => {
                self.line_break();
                self.children(id);
                self.line_break();
            }
            "td" | "th" => {
                self.children(id);
                if !self.out.ends_with(' ') && !self.at_line_start() {
                    self.out.push(' ');
                }
            }
            t if BLOCK_CONTAINERS.contains(&t) => {
                self.block_break();
                self.children(id);
                self.block_break();
            }
            t if INLINE_CONTAINERS.contains(&t) => self.children(id),
            _ => match self.policy.unknown {
                UnknownTags::PassThrough => self.out.push_str(&outer_html(self.dom, id)),
                UnknownTags::Drop => {}
                UnknownTags::Bypass => self.children(id),
            },
        }
    }

    fn heading(&mut self, id: NodeId, tag: &str) {
        let level = tag[1..].parse::<usize>().unwrap_or(1);
        self.block_break();

        let start = self.out.len();
        self.children(id);
        let inner = self.out.split_off(start);
        let inner = inner.replace("  \n", " ").replace('\n', " ");
        let inner = inner.trim();

        if !inner.is_empty() {
            self.out.push_str(&"#".repeat(level));
            self.out.push(' ');
            self.out.push_str(inner);
        }
        self.block_break();
    }

    /// Render children and wrap them in an inline marker such as `**`.
    ///
    /// Surrounding whitespace moves outside the markers; empty content
    /// produces no markers at all.
    fn wrapped(&mut self, id: NodeId, marker: &str) {
        let start = self.out.len();
        self.children(id);
        let inner = self.out.split_off(start);
        let trimmed = inner.trim();

        if trimmed.is_empty() {
            self.out.push_str(&inner);
            return;
        }
        if inner.starts_with(char::is_whitespace) && !self.at_line_start() {
            self.out.push(' ');
        }
        self.out.push_str(marker);
        self.out.push_str(trimmed);
        self.out.push_str(marker);
        if inner.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn code_block(&mut self, id: NodeId) {
        let dom = self.dom;
        let content = dom.text_content(id);
        let content = content.strip_prefix('\n').unwrap_or(&content);
        let content = content.trim_end_matches('\n');

        let language = dom
            .children(id)
            .find(|&c| dom.tag_name(c) == Some("code"))
            .and_then(|code| dom.get_attr(code, "class"))
            .and_then(|class| {
                class
                    .split_ascii_whitespace()
                    .find_map(|c| c.strip_prefix("language-"))
            })
            .unwrap_or("");

        let fence = code_fence(content);
        self.block_break();
        self.out.push_str(&fence);
        self.out.push_str(language);
        self.out.push('\n');
        self.out.push_str(content);
        self.out.push('\n');
        self.out.push_str(&fence);
        self.block_break();
    }

    fn link(&mut self, id: NodeId) {
        let dom = self.dom;
        let start = self.out.len();
        self.children(id);
        let inner = self.out.split_off(start);
        let text = inner.trim();

        let href = dom
            .get_attr(id, "href")
            .map(str::trim)
            .filter(|h| !h.is_empty());

        match href {
            Some(href) if !text.is_empty() => {
                if inner.starts_with(' ') && !self.at_line_start() && !self.out.ends_with(' ') {
                    self.out.push(' ');
                }
                self.out.push('[');
                self.out.push_str(text);
                self.out.push_str("](");
                self.out.push_str(&link_destination(href));
                if let Some(title) = dom.get_attr(id, "title").filter(|t| !t.is_empty()) {
                    self.out.push_str(" \"");
                    self.out.push_str(&title.replace('"', "\\\""));
                    self.out.push('"');
                }
                self.out.push(')');
                if inner.ends_with(' ') {
                    self.out.push(' ');
                }
            }
            _ => self.out.push_str(&inner),
        }
    }

    fn image(&mut self, id: NodeId) {
        let dom = self.dom;
        let Some(src) = dom.get_attr(id, "src").filter(|s| !s.is_empty()) else {
            return;
        };
        let alt = dom.get_attr(id, "alt").unwrap_or("");
        let alt = alt.replace('[', "\\[").replace(']', "\\]");
        self.out.push_str("![");
        self.out.push_str(alt.trim());
        self.out.push_str("](");
        self.out.push_str(&link_destination(src));
        self.out.push(')');
    }

    fn list(&mut self, id: NodeId, ordered: bool) {
        let dom = self.dom;
        let start = if ordered {
            dom.get_attr(id, "start")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1)
        } else {
            1
        };

        let mut items = Vec::new();
        for (i, li) in dom
            .children(id)
            .filter(|&c| dom.tag_name(c) == Some("li"))
            .enumerate()
        {
            let marker = if ordered {
                format!("{}. ", start + i)
            } else {
                "- ".to_string()
            };
            let body = self.nested(li, true);
            items.push(indent_item(&marker, &body));
        }

        if items.is_empty() {
            return;
        }

        self.block_break();
        self.out.push_str(&items.join("\n"));
        self.block_break();
    }

    fn blockquote(&mut self, id: NodeId) {
        let body = self.nested(id, false);
        if body.is_empty() {
            return;
        }

        let quoted = body
            .lines()
            .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
            .collect::<Vec<_>>()
            .join("\n");

        self.block_break();
        self.out.push_str(&quoted);
        self.block_break();
    }
}

/// Put `marker` before the first line and align the rest under it.
fn indent_item(marker: &str, body: &str) -> String {
    let indent = " ".repeat(marker.len());
    let mut item = marker.to_string();
    for (n, line) in body.lines().enumerate() {
        if n > 0 {
            item.push('\n');
            if !line.is_empty() {
                item.push_str(&indent);
            }
        }
        item.push_str(line);
    }
    item.truncate(item.trim_end().len());
    item
}

/// Wrap destinations containing spaces or parentheses in angle brackets.
fn link_destination(url: &str) -> String {
    if url.contains([' ', '(', ')']) {
        format!("<{url}>")
    } else {
        url.to_string()
    }
}
