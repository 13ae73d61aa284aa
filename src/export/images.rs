//! Image localization.
//!
//! Image references are found twice per section: as `<img src>` attributes
//! before rendering, and as `![alt](url)` links in the rendered Markdown.
//! Both passes go through [`localize`], which copies the image into the media
//! directory and returns the rewritten reference. A reference that cannot be
//! localized is logged and left as it was; it never aborts the export.

use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::archive::Archive;
use crate::dom::Dom;
use crate::epub::Publication;
use crate::error::{Error, Result};
use crate::util::{basename, join_root, time_seed_nanos};

/// Name of the media directory next to the Markdown output.
pub const IMAGES_DIR: &str = "images";

/// Where an image reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Already relative to the output (`./...`, `../...`) or absolute
    /// (`/...`), or inline `data:`. Never rewritten.
    Local,
    /// An `http://` or `https://` URL.
    Remote(String),
    /// A path inside the archive, already resolved against the root dir.
    Internal(String),
}

/// Classify an image reference found in a content document.
pub fn classify(reference: &str, root_dir: &str) -> ImageRef {
    if reference.starts_with('.') || reference.starts_with('/') || reference.starts_with("data:") {
        ImageRef::Local
    } else if reference.starts_with("http://") || reference.starts_with("https://") {
        ImageRef::Remote(reference.to_string())
    } else {
        ImageRef::Internal(join_root(root_dir, reference))
    }
}

/// Source of remote image bytes.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher with a per-request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Everything one export needs to localize images.
pub struct ImageContext<'a, R: Read + Seek = File> {
    pub media_dir: PathBuf,
    pub archive: &'a Archive<R>,
    pub root_dir: &'a str,
    pub fetcher: &'a dyn Fetcher,
}

impl<'a, R: Read + Seek> ImageContext<'a, R> {
    pub fn new(
        media_dir: impl Into<PathBuf>,
        archive: &'a Archive<R>,
        root_dir: &'a str,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            media_dir: media_dir.into(),
            archive,
            root_dir,
            fetcher,
        }
    }

    pub fn classify(&self, reference: &str) -> ImageRef {
        classify(reference, self.root_dir)
    }
}

/// Result of localizing one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized {
    /// The reference to put in the output (unchanged on failure).
    pub reference: String,
    /// File written to the media directory, if any.
    pub written: Option<PathBuf>,
}

impl Localized {
    fn unchanged(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            written: None,
        }
    }
}

/// Classify a reference and, unless it is local, copy the image into the
/// media directory.
pub fn localize<R: Read + Seek>(reference: &str, ctx: &ImageContext<'_, R>) -> Localized {
    if reference.is_empty() {
        return Localized::unchanged(reference);
    }

    let (name, bytes) = match ctx.classify(reference) {
        ImageRef::Local => return Localized::unchanged(reference),
        ImageRef::Remote(url) => match ctx.fetcher.fetch(&url) {
            Ok(bytes) => (remote_file_name(&url), bytes),
            Err(e) => {
                warn!(reference, error = %e, "failed to download image");
                return Localized::unchanged(reference);
            }
        },
        ImageRef::Internal(path) => match ctx.archive.find(&path) {
            Ok(bytes) => (basename(reference).to_string(), bytes),
            Err(e) => {
                warn!(reference, %path, error = %e, "failed to extract image");
                return Localized::unchanged(reference);
            }
        },
    };

    if name.is_empty() {
        warn!(reference, "image reference has no file name");
        return Localized::unchanged(reference);
    }

    match write_media(&ctx.media_dir, &name, &bytes) {
        Ok(path) => Localized {
            reference: format!("./{IMAGES_DIR}/{name}"),
            written: Some(path),
        },
        Err(e) => {
            warn!(reference, error = %e, "failed to write image");
            Localized::unchanged(reference)
        }
    }
}

/// Rewrite the `src` of every `<img>` in the document.
///
/// Returns the files written.
pub fn localize_dom<R: Read + Seek>(dom: &mut Dom, ctx: &ImageContext<'_, R>) -> Vec<PathBuf> {
    let mut written = Vec::new();

    for img in dom.elements_by_tag(dom.document(), "img") {
        let Some(src) = dom.get_attr(img, "src").map(str::to_string) else {
            continue;
        };
        let localized = localize(&src, ctx);
        if localized.reference != src {
            dom.set_attr(img, "src", &localized.reference);
        }
        written.extend(localized.written);
    }

    written
}

/// Rewrite the target of every `![alt](url)` image link in Markdown text.
///
/// Alt text is kept as is. A destination wrapped in `<...>` is unwrapped
/// before lookup. Links that cannot be localized are left untouched.
pub fn localize_markdown<R: Read + Seek>(text: &str, ctx: &ImageContext<'_, R>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("![") {
        let Some(link) = parse_image_link(&rest[start..]) else {
            out.push_str(&rest[..start + 2]);
            rest = &rest[start + 2..];
            continue;
        };

        out.push_str(&rest[..start]);
        let target = link
            .url
            .strip_prefix('<')
            .and_then(|u| u.strip_suffix('>'))
            .unwrap_or(link.url);
        let localized = localize(target, ctx);

        if localized.written.is_some() {
            out.push_str("![");
            out.push_str(link.alt);
            out.push_str("](");
            out.push_str(&localized.reference);
            out.push(')');
        } else {
            out.push_str(&rest[start..start + link.len]);
        }
        rest = &rest[start + link.len..];
    }

    out.push_str(rest);
    out
}

struct ImageLink<'t> {
    alt: &'t str,
    url: &'t str,
    /// Byte length of the whole `![alt](url)` match.
    len: usize,
}

/// Match `![alt](url)` at the start of `text`; neither part may span lines.
fn parse_image_link(text: &str) -> Option<ImageLink<'_>> {
    let body = text.strip_prefix("![")?;
    let line_end = body.find('\n').unwrap_or(body.len());
    let line = &body[..line_end];

    let alt_end = line.find("](")?;
    let after = &line[alt_end + 2..];
    let url_end = after.find(')')?;

    Some(ImageLink {
        alt: &line[..alt_end],
        url: &after[..url_end],
        len: 2 + alt_end + 2 + url_end + 1,
    })
}

/// Copy every image in the manifest into `media_dir`.
///
/// Items missing from the archive are skipped. Returns the files written.
pub fn extract_manifest_images<R: Read + Seek>(
    publication: &Publication<R>,
    media_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(media_dir)?;
    let mut written = Vec::new();

    for item in publication.manifest().iter().filter(|item| item.is_image()) {
        let path = publication.resolve(&item.href);
        let bytes = match publication.archive().find(&path) {
            Ok(bytes) => bytes,
            Err(Error::MissingEntry(_)) => {
                debug!(%path, "manifest image not in archive, skipping");
                continue;
            }
            Err(e) => {
                warn!(%path, error = %e, "failed to extract manifest image");
                continue;
            }
        };

        let name = basename(&item.href);
        if name.is_empty() {
            continue;
        }
        written.push(write_media(media_dir, name, &bytes)?);
    }

    debug!(count = written.len(), "extracted manifest images");
    Ok(written)
}

/// File name for a downloaded image: the last segment of the URL path, or a
/// time-based fallback.
fn remote_file_name(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = without_scheme
        .find('/')
        .map(|i| &without_scheme[i..])
        .unwrap_or("");
    let path = path.split(['?', '#']).next().unwrap_or("");

    match basename(path) {
        "" => format!("image_{}.jpg", time_seed_nanos()),
        name => name.to_string(),
    }
}

fn write_media(media_dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let path = media_dir.join(name);
    if path.exists() {
        debug!(path = %path.display(), "overwriting existing image");
    }
    fs::write(&path, bytes)?;
    Ok(path)
}
