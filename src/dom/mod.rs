//! Lenient HTML/XHTML parsing into an arena DOM.
//!
//! Chapters are parsed with html5ever's HTML tree builder rather than an XML
//! parser, so malformed XHTML still yields a usable tree. Prefixed attributes
//! such as `epub:type` keep their literal name.
//!
//! The HTML tree builder ignores `/>` on non-void elements, so `<title/>` or
//! `<script src="x.js"/>` would swallow the rest of the document as raw text.
//! Well-formed XHTML has those expanded to an explicit start and end tag
//! first.

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, Children, Dom, Node, NodeData, NodeId};
pub use serialize::{escape_attr, escape_text, inner_html, outer_html, to_html};
pub use tree_sink::{DomSink, NodeHandle};

use std::borrow::Cow;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use quick_xml::Reader;
use quick_xml::events::Event;

use serialize::VOID_ELEMENTS;

/// Parse markup into a [`Dom`]. Never fails.
pub fn parse_html(markup: &str) -> Dom {
    let markup = expand_self_closing(markup);
    parse_document(DomSink::new(), ParseOpts::default())
        .from_utf8()
        .one(markup.as_bytes())
        .into_dom()
}

/// Rewrite XML self-closing non-void elements (`<x/>`) as `<x></x>`.
///
/// Void elements such as `<br/>` are left alone. Markup that is not
/// well-formed XML is returned unchanged.
pub fn expand_self_closing(markup: &str) -> Cow<'_, str> {
    let mut reader = Reader::from_str(markup);
    let mut out = String::new();
    let mut copied = 0usize;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(&name)) {
                    continue;
                }
                let end = reader.buffer_position() as usize;
                let Some(head) = markup
                    .get(start..end)
                    .and_then(|tag| tag.strip_suffix("/>"))
                else {
                    return Cow::Borrowed(markup);
                };
                out.push_str(&markup[copied..start]);
                out.push_str(head.trim_end());
                out.push_str("></");
                out.push_str(&name);
                out.push('>');
                copied = end;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return Cow::Borrowed(markup),
        }
    }

    if copied == 0 {
        return Cow::Borrowed(markup);
    }
    out.push_str(&markup[copied..]);
    Cow::Owned(out)
}

/// Text of the document's `<title>` element, trimmed.
///
/// Returns `None` when the element is missing or blank.
pub fn document_title(dom: &Dom) -> Option<String> {
    let title = dom.find_by_tag("title")?;
    let text = dom.text_content(title);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}
