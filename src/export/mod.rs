//! Markdown export: one file per section, or a single merged file.
//!
//! # Example
//!
//! ```no_run
//! use epub2md::Publication;
//! use epub2md::export::{Converter, ExportOptions};
//!
//! let book = Publication::open("book.epub")?;
//! let converter = Converter::new(&book);
//!
//! // book_markdown/01-Cover.md, book_markdown/02-Chapter_1.md, ...
//! let files = converter.convert_to_markdown(&ExportOptions::default())?;
//!
//! // book_merged.md, with images copied to ./images
//! let merged = converter.convert_to_single_markdown(
//!     &ExportOptions::default().with_localize_images(true),
//! )?;
//! # Ok::<(), epub2md::Error>(())
//! ```

mod images;
mod naming;

pub use images::{
    Fetcher, HttpFetcher, IMAGES_DIR, ImageContext, ImageRef, Localized, classify,
    extract_manifest_images, localize, localize_dom, localize_markdown,
};
pub use naming::{sanitize_filename, section_filename};

use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::book::Section;
use crate::dom::parse_html;
use crate::epub::Publication;
use crate::error::Result;
use crate::markdown::{HtmlToMarkdown, MarkdownRenderer, TagPolicy, normalize_blank_lines};

/// Separator between sections in merged output.
const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Default HTTP timeout for remote images.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a Markdown export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Copy referenced images into an `images/` directory and rewrite links.
    pub localize_images: bool,
    /// Directory for per-section files (default: `<stem>_markdown`).
    pub output_dir: Option<PathBuf>,
    /// Path of the merged file (default: `<stem>_merged.md`).
    pub output_filename: Option<PathBuf>,
    pub tag_policy: TagPolicy,
    pub http_timeout: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            localize_images: false,
            output_dir: None,
            output_filename: None,
            tag_policy: TagPolicy::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_localize_images(mut self, localize: bool) -> Self {
        self.localize_images = localize;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_output_filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_filename = Some(path.into());
        self
    }

    pub fn with_tag_policy(mut self, policy: TagPolicy) -> Self {
        self.tag_policy = policy;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

/// Default directory for per-section output: `<dir>/<stem>_markdown`.
pub fn default_output_dir(input: &Path) -> PathBuf {
    sibling(input, "_markdown")
}

/// Default merged output file: `<dir>/<stem>_merged.md`.
pub fn default_merged_path(input: &Path) -> PathBuf {
    sibling(input, "_merged.md")
}

fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());
    let name = format!("{stem}{suffix}");
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Converts the sections of a [`Publication`] to Markdown files.
///
/// A converter holds no state between exports; every call builds its own
/// image context and drops it before returning.
pub struct Converter<'a, R: Read + Seek = File> {
    publication: &'a Publication<R>,
    renderer: Box<dyn MarkdownRenderer + 'a>,
    fetcher: Option<Box<dyn Fetcher + 'a>>,
}

impl<'a, R: Read + Seek> Converter<'a, R> {
    pub fn new(publication: &'a Publication<R>) -> Self {
        Self {
            publication,
            renderer: Box::new(HtmlToMarkdown),
            fetcher: None,
        }
    }

    /// Use a different HTML → Markdown renderer.
    pub fn with_renderer(mut self, renderer: impl MarkdownRenderer + 'a) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Use a custom source for remote images instead of HTTP.
    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'a) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn publication(&self) -> &Publication<R> {
        self.publication
    }

    /// Write one Markdown file per section into the output directory.
    ///
    /// Returns the written files in reading order.
    pub fn convert_to_markdown(&self, options: &ExportOptions) -> Result<Vec<PathBuf>> {
        let out_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => default_output_dir(&self.input_path()),
        };
        fs::create_dir_all(&out_dir)?;

        let sections = self.publication.sections();
        let files = self.with_image_context(options, &out_dir, |ctx| {
            let mut files = Vec::with_capacity(sections.len());
            for (index, section) in sections.iter().enumerate() {
                let markdown = self.render_section(section, ctx, &options.tag_policy);
                let name = section_filename(index, sections.len(), section.display_name());
                let path = out_dir.join(name);
                fs::write(&path, with_final_newline(markdown))?;
                debug!(path = %path.display(), "wrote section");
                files.push(path);
            }
            Ok(files)
        })?;

        info!(
            count = files.len(),
            dir = %out_dir.display(),
            "converted sections to markdown"
        );
        Ok(files)
    }

    /// Write all sections into a single Markdown file.
    ///
    /// Each section starts with `# <title>` and sections are separated by a
    /// horizontal rule.
    pub fn convert_to_single_markdown(&self, options: &ExportOptions) -> Result<PathBuf> {
        let path = match &options.output_filename {
            Some(path) => path.clone(),
            None => default_merged_path(&self.input_path()),
        };
        let out_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&out_dir)?;

        let merged = self.with_image_context(options, &out_dir, |ctx| {
            let parts: Vec<String> = self
                .publication
                .sections()
                .iter()
                .map(|section| {
                    let markdown = self.render_section(section, ctx, &options.tag_policy);
                    let part = format!("# {}\n\n{}", section.display_name(), markdown);
                    part.trim_end().to_string()
                })
                .collect();
            Ok(parts.join(SECTION_SEPARATOR))
        })?;

        fs::write(&path, with_final_newline(merged))?;
        info!(path = %path.display(), "wrote merged markdown");
        Ok(path)
    }

    /// Render one section to Markdown, localizing images when `ctx` is given.
    pub fn render_section(
        &self,
        section: &Section,
        ctx: Option<&ImageContext<'_, R>>,
        policy: &TagPolicy,
    ) -> String {
        let mut dom = parse_html(&section.raw_markup);
        if let Some(ctx) = ctx {
            localize_dom(&mut dom, ctx);
        }

        let markdown = normalize_blank_lines(&self.renderer.render(&dom, policy));
        match ctx {
            Some(ctx) => localize_markdown(&markdown, ctx),
            None => markdown,
        }
    }

    fn input_path(&self) -> PathBuf {
        self.publication
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("book.epub"))
    }

    /// Run `f` with an image context rooted at `<out_dir>/images`, or with
    /// `None` when images are not localized.
    fn with_image_context<T>(
        &self,
        options: &ExportOptions,
        out_dir: &Path,
        f: impl FnOnce(Option<&ImageContext<'_, R>>) -> Result<T>,
    ) -> Result<T> {
        if !options.localize_images {
            return f(None);
        }

        let media_dir = out_dir.join(IMAGES_DIR);
        extract_manifest_images(self.publication, &media_dir)?;

        let http;
        let fetcher: &dyn Fetcher = match &self.fetcher {
            Some(fetcher) => fetcher.as_ref(),
            None => {
                http = HttpFetcher::new(options.http_timeout)?;
                &http
            }
        };

        let ctx = ImageContext::new(
            media_dir,
            self.publication.archive(),
            self.publication.root_dir(),
            fetcher,
        );
        f(Some(&ctx))
    }
}

fn with_final_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_destinations() {
        let input = Path::new("/books/novel.epub");
        assert_eq!(default_output_dir(input), PathBuf::from("/books/novel_markdown"));
        assert_eq!(default_merged_path(input), PathBuf::from("/books/novel_merged.md"));
        assert_eq!(default_output_dir(Path::new("a.epub")), PathBuf::from("a_markdown"));
    }

    #[test]
    fn test_options_builder() {
        let options = ExportOptions::new()
            .with_localize_images(true)
            .with_output_dir("out")
            .with_output_filename("out/all.md")
            .with_http_timeout(Duration::from_secs(5));
        assert!(options.localize_images);
        assert_eq!(options.output_dir, Some(PathBuf::from("out")));
        assert_eq!(options.output_filename, Some(PathBuf::from("out/all.md")));
        assert_eq!(options.http_timeout, Duration::from_secs(5));
        assert_eq!(ExportOptions::default().http_timeout, DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_with_final_newline() {
        assert_eq!(with_final_newline(String::new()), "");
        assert_eq!(with_final_newline("a".into()), "a\n");
        assert_eq!(with_final_newline("a\n".into()), "a\n");
    }
}
