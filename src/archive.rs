//! Random-access entry store over an EPUB's ZIP container.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::util::{decode_text, extract_xml_encoding, normalize_entry_path, strip_bom};

/// Read-only handle over the named entries of a ZIP archive.
///
/// Entry names are case-sensitive and `/`-separated. Lookups accept a path
/// with or without one leading slash. The underlying [`ZipArchive`] needs
/// `&mut` access to read, so it sits behind a `RefCell`; an `Archive` is
/// meant to be used from one thread at a time.
pub struct Archive<R: Read + Seek = File> {
    zip: RefCell<ZipArchive<R>>,
}

impl Archive<File> {
    /// Open an archive from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open an archive from any [`Read`] + [`Seek`] source.
    pub fn from_reader(reader: R) -> Result<Self> {
        Ok(Self {
            zip: RefCell::new(ZipArchive::new(reader)?),
        })
    }

    /// Read the full bytes of an entry.
    ///
    /// Falls back to the percent-decoded path when the literal name is absent,
    /// since some packagers store `my%20file.png` as `my file.png`.
    pub fn find(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_entry_path(path);
        let mut zip = self.zip.borrow_mut();

        match read_entry(&mut zip, path) {
            Err(Error::MissingEntry(_)) => {}
            other => return other,
        }

        match percent_encoding::percent_decode_str(path).decode_utf8() {
            Ok(decoded) if decoded != path => read_entry(&mut zip, &decoded)
                .map_err(|e| match e {
                    Error::MissingEntry(_) => Error::MissingEntry(path.to_string()),
                    other => other,
                }),
            _ => Err(Error::MissingEntry(path.to_string())),
        }
    }

    /// Read an entry as text, honoring a BOM or XML encoding declaration.
    pub fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.find(path)?;
        let bytes = strip_bom(&bytes);
        Ok(decode_text(bytes, extract_xml_encoding(bytes)).into_owned())
    }

    /// Check whether an entry exists (literal name only).
    pub fn contains(&self, path: &str) -> bool {
        let path = normalize_entry_path(path);
        self.zip.borrow().index_for_name(path).is_some()
    }

    /// List all entry names in archive order.
    pub fn list(&self) -> Vec<String> {
        self.zip
            .borrow()
            .file_names()
            .map(|name| name.to_string())
            .collect()
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.zip.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_entry<R: Read + Seek>(zip: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    match zip.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut contents)?;
            Ok(contents)
        }
        Err(zip::result::ZipError::FileNotFound) => Err(Error::MissingEntry(path.to_string())),
        Err(e) => Err(e.into()),
    }
}
