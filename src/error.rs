//! Error types for epub2md operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a conversion.
///
/// Per-image failures during localization are not represented here: they are
/// logged and the original reference is kept.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("EPUB file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("No rootfile found in META-INF/container.xml")]
    MissingRootfile,

    #[error("File not found in EPUB: {0}")]
    MissingEntry(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
