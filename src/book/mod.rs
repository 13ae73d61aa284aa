//! Resolved document model of an EPUB package.

use std::collections::HashMap;

/// Media type of XHTML content documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Media type of the legacy NCX navigation-control document.
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// Publication metadata (Dublin Core subset).
///
/// Every field is optional; a missing or empty element is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Metadata {
    pub title: Option<String>,
    /// First `dc:creator`.
    pub author: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub rights: Option<String>,
    /// First `dc:identifier`.
    pub identifier: Option<String>,
    pub date: Option<String>,
}

/// A resource declared in the package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ManifestItem {
    pub id: String,
    /// Path relative to the package document's directory.
    pub href: String,
    pub media_type: String,
}

impl ManifestItem {
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
        }
    }

    pub fn is_xhtml(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Manifest items keyed by id, iterated in document order.
///
/// Inserting an id that already exists replaces the stored item but keeps
/// the position of the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    items: Vec<ManifestItem>,
    index: HashMap<String, usize>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: ManifestItem) {
        match self.index.get(&item.id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ManifestItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestItem> {
        self.items.iter()
    }

    /// First item, in document order, satisfying the predicate.
    pub fn find<F>(&self, predicate: F) -> Option<&ManifestItem>
    where
        F: Fn(&ManifestItem) -> bool,
    {
        self.items.iter().find(|item| predicate(item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestItem;
    type IntoIter = std::slice::Iter<'a, ManifestItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// An entry of the reading order (spine).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct SpineEntry {
    /// Manifest id this entry points at.
    pub idref: String,
    /// False only when marked `linear="no"`.
    pub linear: bool,
    /// 0-based index in the spine.
    pub position: usize,
}

/// A table of contents entry (hierarchical).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct TocNode {
    /// Label text, trimmed.
    pub name: Option<String>,
    /// Target href as written in the navigation document.
    pub path: Option<String>,
    /// NCX `playOrder`, when present.
    pub play_order: Option<String>,
    pub children: Vec<TocNode>,
}

impl TocNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn with_child(mut self, child: TocNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, self included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TocNode::count).sum::<usize>()
    }
}

/// A content document in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Manifest id.
    pub id: String,
    /// Archive path of the document.
    pub path: String,
    pub raw_markup: String,
    /// Text of the document's own `<title>`.
    pub title: Option<String>,
}

impl Section {
    /// Title if known, else the manifest id.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}
