//! EPUB parsing utilities (container.xml, OPF, NCX).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{Manifest, ManifestItem, Metadata, SpineEntry, TocNode};
use crate::error::{Error, Result};

/// Parsed OPF package data.
#[derive(Debug, Default)]
pub struct OpfData {
    pub metadata: Metadata,
    pub manifest: Manifest,
    pub spine: Vec<SpineEntry>,
}

/// Parse META-INF/container.xml to find the package document path.
///
/// Returns the `full-path` of the first `rootfile` that declares one.
pub fn parse_container_xml(content: &str) -> Result<String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr(&e, b"full-path")
                    && !path.is_empty()
                {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::MissingRootfile)
}

/// Metadata fields read from the OPF `<metadata>` block.
#[derive(Clone, Copy)]
enum MetaField {
    Title,
    Creator,
    Description,
    Language,
    Publisher,
    Rights,
    Identifier,
    Date,
}

impl MetaField {
    fn from_local(local: &[u8]) -> Option<Self> {
        Some(match local {
            b"title" => MetaField::Title,
            b"creator" => MetaField::Creator,
            b"description" => MetaField::Description,
            b"language" => MetaField::Language,
            b"publisher" => MetaField::Publisher,
            b"rights" => MetaField::Rights,
            b"identifier" => MetaField::Identifier,
            b"date" => MetaField::Date,
            _ => return None,
        })
    }

    fn slot(self, metadata: &mut Metadata) -> &mut Option<String> {
        match self {
            MetaField::Title => &mut metadata.title,
            MetaField::Creator => &mut metadata.author,
            MetaField::Description => &mut metadata.description,
            MetaField::Language => &mut metadata.language,
            MetaField::Publisher => &mut metadata.publisher,
            MetaField::Rights => &mut metadata.rights,
            MetaField::Identifier => &mut metadata.identifier,
            MetaField::Date => &mut metadata.date,
        }
    }
}

/// Parse the OPF package document.
///
/// Metadata lookups never fail: a missing, empty or repeated element simply
/// leaves the first value (or `None`) in place.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);

    let mut opf = OpfData::default();
    let mut in_metadata = false;
    let mut in_manifest = false;
    let mut in_spine = false;
    let mut current: Option<MetaField> = None;
    let mut depth_in_field = 0usize;
    let mut buf_text = String::new();
    let mut itemref_count = 0usize;

    loop {
        let event = reader.read_event()?;
        let is_start = matches!(event, Event::Start(_));

        match event {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if current.is_some() {
                    if is_start {
                        depth_in_field += 1;
                    }
                    continue;
                }

                match local {
                    b"metadata" if is_start => in_metadata = true,
                    b"manifest" if is_start => in_manifest = true,
                    b"spine" if is_start => in_spine = true,
                    b"item" if in_manifest => {
                        if let Some(item) = manifest_item(&e) {
                            opf.manifest.insert(item);
                        }
                    }
                    b"itemref" if in_spine => {
                        let position = itemref_count;
                        itemref_count += 1;
                        if let Some(idref) = attr(&e, b"idref") {
                            let linear = attr(&e, b"linear").as_deref() != Some("no");
                            opf.spine.push(SpineEntry {
                                idref,
                                linear,
                                position,
                            });
                        }
                    }
                    _ if in_metadata && is_start => {
                        if let Some(field) = MetaField::from_local(local) {
                            current = Some(field);
                            depth_in_field = 0;
                            buf_text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Event::End(e) => {
                if let Some(field) = current {
                    if depth_in_field > 0 {
                        depth_in_field -= 1;
                        continue;
                    }
                    let slot = field.slot(&mut opf.metadata);
                    if slot.is_none() {
                        *slot = non_empty(&buf_text);
                    }
                    current = None;
                    buf_text.clear();
                    continue;
                }

                match local_name(e.name().as_ref()) {
                    b"metadata" => in_metadata = false,
                    b"manifest" => in_manifest = false,
                    b"spine" => in_spine = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(opf)
}

fn manifest_item(e: &BytesStart<'_>) -> Option<ManifestItem> {
    let id = attr(e, b"id").filter(|id| !id.is_empty())?;
    Some(ManifestItem {
        id,
        href: attr(e, b"href").unwrap_or_default(),
        media_type: attr(e, b"media-type").unwrap_or_default(),
    })
}

/// Parse an NCX document into a TOC forest.
///
/// Each `navPoint` becomes a node; its label comes from its own
/// `navLabel/text` and its target from its own `content@src`. Either may be
/// missing, in which case the field is `None`.
pub fn parse_ncx(content: &str) -> Result<Vec<TocNode>> {
    let mut reader = Reader::from_str(content);

    struct NavPointState {
        node: TocNode,
        label: String,
        has_label: bool,
    }

    let mut stack: Vec<NavPointState> = Vec::new();
    let mut roots: Vec<TocNode> = Vec::new();
    let mut in_nav_map = false;
    let mut label_depth: Option<usize> = None;
    let mut in_text = false;

    loop {
        let event = reader.read_event()?;
        let is_start = matches!(event, Event::Start(_));

        match event {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"navMap" if is_start => in_nav_map = true,
                    b"navPoint" if in_nav_map => {
                        let state = NavPointState {
                            node: TocNode {
                                play_order: attr(&e, b"playOrder"),
                                ..Default::default()
                            },
                            label: String::new(),
                            has_label: false,
                        };
                        if is_start {
                            stack.push(state);
                        } else {
                            match stack.last_mut() {
                                Some(parent) => parent.node.children.push(state.node),
                                None => roots.push(state.node),
                            }
                        }
                    }
                    b"navLabel" if is_start && label_depth.is_none() => {
                        if let Some(top) = stack.last()
                            && !top.has_label
                        {
                            label_depth = Some(stack.len());
                        }
                    }
                    b"text" if is_start && label_depth == Some(stack.len()) => in_text = true,
                    b"content" => {
                        if let Some(top) = stack.last_mut()
                            && top.node.path.is_none()
                        {
                            top.node.path = attr(&e, b"src");
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if in_text && let Some(top) = stack.last_mut() {
                    top.label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if in_text && let Some(top) = stack.last_mut() {
                    top.label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if in_text && let Some(top) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        top.label.push_str(&resolved);
                    }
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navLabel" => {
                    if label_depth == Some(stack.len()) {
                        if let Some(top) = stack.last_mut() {
                            top.has_label = true;
                        }
                        label_depth = None;
                    }
                }
                b"navPoint" => {
                    if let Some(mut state) = stack.pop() {
                        state.node.name = non_empty(&state.label);
                        match stack.last_mut() {
                            Some(parent) => parent.node.children.push(state.node),
                            None => roots.push(state.node),
                        }
                    }
                }
                b"navMap" => in_nav_map = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(roots)
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Read an attribute by exact key, unescaping entity references.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| unescape(&String::from_utf8_lossy(&a.value)))
}

/// Trim, and turn blank text into `None`.
fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Replace `&name;` references; unknown ones are kept verbatim.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';') {
            Some(semi) => match resolve_entity(&tail[1..semi]) {
                Some(resolved) => {
                    out.push_str(&resolved);
                    rest = &tail[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };

    code.and_then(char::from_u32).map(|c| c.to_string())
}
