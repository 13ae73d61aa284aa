//! # epub2md
//!
//! Convert EPUB e-books to Markdown, optionally copying every referenced
//! image into a local `images/` folder.
//!
//! ## Features
//!
//! - Reads EPUB 2 (NCX) and EPUB 3 (navigation document) tables of contents
//! - One Markdown file per section, or a single merged file
//! - Images from the archive or from the web are localized and links rewritten
//! - A failed image never aborts the conversion; it is logged and left as is
//!
//! ## Quick Start
//!
//! ```no_run
//! use epub2md::{Converter, ExportOptions, Publication};
//!
//! let book = Publication::open("input.epub")?;
//! println!("{:?} by {:?}", book.metadata().title, book.metadata().author);
//!
//! let options = ExportOptions::new()
//!     .with_output_dir("out")
//!     .with_localize_images(true);
//! let files = Converter::new(&book).convert_to_markdown(&options)?;
//! println!("wrote {} files", files.len());
//! # Ok::<(), epub2md::Error>(())
//! ```
//!
//! ## Rendering a fragment
//!
//! ```
//! use epub2md::markdown::{TagPolicy, render_html};
//!
//! let md = render_html("<p>Hello <strong>world</strong></p>", &TagPolicy::default());
//! assert_eq!(md, "Hello **world**");
//! ```

pub mod archive;
pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub mod export;
pub mod markdown;
pub(crate) mod util;

pub use archive::Archive;
pub use book::{Manifest, ManifestItem, Metadata, Section, SpineEntry, TocNode};
pub use epub::Publication;
pub use error::{Error, Result};
pub use export::{Converter, ExportOptions};
pub use markdown::{HtmlToMarkdown, MarkdownRenderer, TagPolicy, UnknownTags};
