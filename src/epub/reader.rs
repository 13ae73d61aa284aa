use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive::Archive;
use crate::book::{Manifest, Metadata, NCX_MEDIA_TYPE, Section, SpineEntry, TocNode};
use crate::dom::{document_title, parse_html};
use crate::error::Result;
use crate::util::{join_root, parent_dir};

use super::nav::parse_nav;
use super::parser::{OpfData, parse_container_xml, parse_ncx, parse_opf};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// A resolved EPUB publication.
///
/// Everything is read eagerly when the publication is opened: metadata,
/// manifest, reading order, table of contents and the markup of every
/// content document in the spine. The archive stays open so that images
/// can be pulled out of it later.
///
/// # Example
///
/// ```no_run
/// use epub2md::Publication;
///
/// let book = Publication::open("path/to/book.epub")?;
/// println!("Title: {:?}", book.metadata().title);
/// println!("{} sections", book.sections().len());
/// # Ok::<(), epub2md::Error>(())
/// ```
pub struct Publication<R: Read + Seek = File> {
    path: Option<PathBuf>,
    archive: Archive<R>,
    opf_path: String,
    root_dir: String,
    metadata: Metadata,
    manifest: Manifest,
    spine: Vec<SpineEntry>,
    toc: Vec<TocNode>,
    sections: Vec<Section>,
}

impl Publication<File> {
    /// Open and resolve an EPUB file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let archive = Archive::open(path)?;
        Self::from_archive(archive, Some(path.to_path_buf()))
    }
}

impl<R: Read + Seek> Publication<R> {
    /// Resolve a publication from an already opened archive.
    ///
    /// `path` is only used to derive default output locations.
    pub fn from_archive(archive: Archive<R>, path: Option<PathBuf>) -> Result<Self> {
        let container = archive.read_text(CONTAINER_PATH)?;
        let opf_path = parse_container_xml(&container)?;
        let root_dir = parent_dir(&opf_path).to_string();
        debug!(%opf_path, %root_dir, "found package document");

        let OpfData {
            metadata,
            manifest,
            spine,
        } = parse_opf(&archive.read_text(&opf_path)?)?;

        let toc = read_toc(&archive, &root_dir, &manifest)?;
        let sections = read_sections(&archive, &root_dir, &manifest, &spine)?;
        debug!(
            manifest = manifest.len(),
            spine = spine.len(),
            sections = sections.len(),
            "resolved publication"
        );

        Ok(Self {
            path,
            archive,
            opf_path,
            root_dir,
            metadata,
            manifest,
            spine,
            toc,
            sections,
        })
    }

    /// Path the publication was opened from, if it came from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn archive(&self) -> &Archive<R> {
        &self.archive
    }

    /// Archive path of the package document.
    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    /// Directory of the package document (`""` at the archive root).
    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn spine(&self) -> &[SpineEntry] {
        &self.spine
    }

    pub fn toc(&self) -> &[TocNode] {
        &self.toc
    }

    /// Content documents in reading order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Resolve a package-relative href to an archive path.
    pub fn resolve(&self, href: &str) -> String {
        join_root(&self.root_dir, href)
    }
}

/// Prefer the NCX; fall back to an XHTML item whose href mentions `nav`.
fn read_toc<R: Read + Seek>(
    archive: &Archive<R>,
    root_dir: &str,
    manifest: &Manifest,
) -> Result<Vec<TocNode>> {
    if let Some(ncx) = manifest.find(|item| item.media_type == NCX_MEDIA_TYPE) {
        let path = join_root(root_dir, &ncx.href);
        debug!(%path, "reading NCX table of contents");
        return parse_ncx(&archive.read_text(&path)?);
    }

    if let Some(nav) = manifest.find(|item| item.is_xhtml() && item.href.contains("nav")) {
        let path = join_root(root_dir, &nav.href);
        debug!(%path, "reading navigation document");
        return Ok(parse_nav(&archive.read_text(&path)?));
    }

    debug!("no table of contents found");
    Ok(Vec::new())
}

fn read_sections<R: Read + Seek>(
    archive: &Archive<R>,
    root_dir: &str,
    manifest: &Manifest,
    spine: &[SpineEntry],
) -> Result<Vec<Section>> {
    let mut sections = Vec::with_capacity(spine.len());

    for entry in spine {
        let Some(item) = manifest.get(&entry.idref) else {
            debug!(idref = %entry.idref, "spine entry not in manifest, skipping");
            continue;
        };
        if !item.is_xhtml() {
            debug!(idref = %entry.idref, media_type = %item.media_type, "skipping non-XHTML spine entry");
            continue;
        }

        let path = join_root(root_dir, &item.href);
        let raw_markup = archive.read_text(&path)?;
        let title = document_title(&parse_html(&raw_markup));

        sections.push(Section {
            id: item.id.clone(),
            path,
            raw_markup,
            title,
        });
    }

    Ok(sections)
}
