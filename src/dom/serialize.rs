//! Serialize a [`Dom`] subtree back to HTML markup.

use super::arena::{Dom, NodeData, NodeId};

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize a node and its subtree.
pub fn outer_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out, false);
    out
}

/// Serialize only the children of a node.
pub fn inner_html(dom: &Dom, id: NodeId) -> String {
    let raw = dom
        .tag_name(id)
        .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, child, &mut out, raw);
    }
    out
}

/// Serialize the whole document.
pub fn to_html(dom: &Dom) -> String {
    inner_html(dom, dom.document())
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String, raw_text: bool) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out, false);
            }
        }
        NodeData::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.qualified_name());
                out.push_str("=\"");
                out.push_str(&escape_attr(&attr.value));
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag) {
                return;
            }

            let raw = RAW_TEXT_ELEMENTS.contains(&tag);
            for child in dom.children(id) {
                write_node(dom, child, out, raw);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Escape text content for HTML output.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for double-quoted output.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_serialize_fragment() {
        let dom = parse_html(r#"<p class="x">a &amp; b<img src="a.png" alt="A &quot;q&quot;"></p>"#);
        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(
            outer_html(&dom, p),
            r#"<p class="x">a &amp; b<img src="a.png" alt="A &quot;q&quot;"></p>"#
        );
    }

    #[test]
    fn test_inner_html_keeps_script_raw() {
        let dom = parse_html("<script>if (a < b) {}</script>");
        let script = dom.find_by_tag("script").unwrap();
        assert_eq!(inner_html(&dom, script), "if (a < b) {}");
    }

    #[test]
    fn test_video_roundtrip() {
        let dom = parse_html(r#"<video controls="" src="v.mp4"><source src="v.webm"></video>"#);
        let video = dom.find_by_tag("video").unwrap();
        assert_eq!(
            outer_html(&dom, video),
            r#"<video controls="" src="v.mp4"><source src="v.webm"></video>"#
        );
    }
}
