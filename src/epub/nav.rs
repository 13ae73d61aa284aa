//! EPUB 3 navigation document (`<nav epub:type="toc">`) parsing.

use crate::book::TocNode;
use crate::dom::{Dom, NodeId, parse_html};

/// Parse the `toc` nav of an EPUB 3 navigation document.
///
/// Only the first `<nav>` whose `epub:type` contains the `toc` token is read.
/// Its first list becomes the top level; a list nested directly in an `<li>`
/// becomes that entry's children. Name and path come from the entry's first
/// `<a>`, wherever it sits; an entry without one falls back to the text of its
/// `<span>` heading and has no path.
pub fn parse_nav(markup: &str) -> Vec<TocNode> {
    let dom = parse_html(markup);
    let Some(nav) = find_toc_nav(&dom) else {
        return Vec::new();
    };

    match dom.elements_by_tag(nav, "ol").into_iter().next() {
        Some(list) => parse_list(&dom, list),
        None => Vec::new(),
    }
}

fn find_toc_nav(dom: &Dom) -> Option<NodeId> {
    dom.elements_by_tag(dom.document(), "nav")
        .into_iter()
        .find(|&nav| {
            dom.get_attr(nav, "epub:type")
                .or_else(|| dom.get_attr(nav, "type"))
                .is_some_and(|types| types.split_ascii_whitespace().any(|t| t == "toc"))
        })
}

fn parse_list(dom: &Dom, list: NodeId) -> Vec<TocNode> {
    dom.children(list)
        .filter(|&child| dom.tag_name(child) == Some("li"))
        .map(|li| parse_item(dom, li))
        .collect()
}

fn parse_item(dom: &Dom, li: NodeId) -> TocNode {
    let mut node = TocNode::default();
    let mut has_anchor = false;

    for child in dom.children(li) {
        match dom.tag_name(child) {
            Some("a") if !has_anchor => {
                has_anchor = true;
                node.name = label(dom, child).or(node.name.take());
                node.path = dom
                    .get_attr(child, "href")
                    .filter(|href| !href.is_empty())
                    .map(str::to_string);
            }
            Some("span") if !has_anchor && node.name.is_none() => node.name = label(dom, child),
            Some("ol") if node.children.is_empty() => node.children = parse_list(dom, child),
            _ => {}
        }
    }

    node
}

fn label(dom: &Dom, id: NodeId) -> Option<String> {
    let text = dom.text_content(id);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}
