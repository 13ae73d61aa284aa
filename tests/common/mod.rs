//! Shared fixtures: EPUB archives built in memory with `zip::ZipWriter`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::path::Path;

use epub2md::export::Fetcher;
use epub2md::{Archive, Error, Publication};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";
pub const JPG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake-jpg";

/// Builds an EPUB archive entry by entry.
pub struct EpubBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    /// Start with the `mimetype` entry only.
    pub fn new() -> Self {
        Self {
            files: vec![("mimetype".into(), b"application/epub+zip".to_vec())],
        }
    }

    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.files.push((name.to_string(), content.as_ref().to_vec()));
        self
    }

    /// Add a container.xml pointing at `opf_path`.
    pub fn container(self, opf_path: &str) -> Self {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{opf_path}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
        );
        self.file("META-INF/container.xml", xml)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in &self.files {
            zip.start_file(name.as_str(), SimpleFileOptions::default())
                .expect("start zip entry");
            zip.write_all(content).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write epub fixture");
    }

    pub fn open(&self) -> Result<Publication<Cursor<Vec<u8>>>, Error> {
        Publication::from_archive(Archive::from_reader(Cursor::new(self.build()))?, None)
    }
}

pub fn xhtml(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>{title}</title></head>
<body>
{body}
</body>
</html>"#
    )
}

pub const SAMPLE_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Sample Book</dc:title>
    <dc:creator>Jane Doe</dc:creator>
    <dc:creator>Second Author</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>
    <dc:description>  A small book for tests.  </dc:description>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="cover" href="cover.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
    <item id="pic" href="img/pic.png" media-type="image/png"/>
    <item id="ghost" href="img/ghost.jpg" media-type="image/jpeg"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="cover" linear="no"/>
    <itemref idref="ch1"/>
    <itemref idref="css"/>
    <itemref idref="not-in-manifest"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

pub const SAMPLE_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:1234"/></head>
  <docTitle><text>Sample Book</text></docTitle>
  <navMap>
    <navPoint id="np1" playOrder="1">
      <navLabel><text>Chapter One</text></navLabel>
      <content src="text/ch1.xhtml"/>
      <navPoint id="np2" playOrder="2">
        <navLabel><text>A Section</text></navLabel>
        <content src="text/ch1.xhtml#s1"/>
      </navPoint>
    </navPoint>
    <navPoint id="np3" playOrder="3">
      <navLabel><text>Chapter Two</text></navLabel>
      <content src="text/ch2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

pub fn sample_ch1() -> String {
    xhtml(
        "Chapter One",
        r#"<h1>Chapter One</h1>
<p>It was a <em>dark</em> and <strong>stormy</strong> night.</p>
<p><img src="img/pic.png" alt="A picture"/></p>
<p><img src="https://example.com/remote/photo.jpg" alt="Remote"/></p>
<p><img src="./already/local.png" alt="Local"/></p>
<p><img src="img/missing.png" alt="Missing"/></p>
<h2 id="s1">A Section</h2>
<ul><li>First</li><li>Second</li></ul>"#,
    )
}

pub fn sample_ch2() -> String {
    xhtml(
        "",
        r#"<h1>Chapter Two</h1>
<p>The end.</p>"#,
    )
}

/// A two-chapter EPUB 2 book with its package under `OEBPS/`.
///
/// Image references in the chapters are relative to the package directory.
pub fn sample_epub() -> EpubBuilder {
    EpubBuilder::new()
        .container("OEBPS/content.opf")
        .file("OEBPS/content.opf", SAMPLE_OPF)
        .file("OEBPS/toc.ncx", SAMPLE_NCX)
        .file("OEBPS/cover.xhtml", xhtml("Cover", r#"<div><img src="img/pic.png" alt=""/></div>"#))
        .file("OEBPS/text/ch1.xhtml", sample_ch1())
        .file("OEBPS/text/ch2.xhtml", sample_ch2())
        .file("OEBPS/style.css", "p { margin: 0 }")
        .file("OEBPS/img/pic.png", PNG_BYTES)
}

/// Fetcher that serves fixed bytes and records every requested URL.
pub struct StubFetcher {
    pub body: Option<Vec<u8>>,
    pub requests: RefCell<Vec<String>>,
}

impl StubFetcher {
    pub fn serving(body: &[u8]) -> Self {
        Self {
            body: Some(body.to_vec()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            body: None,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> epub2md::Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        match &self.body {
            Some(body) => Ok(body.clone()),
            None => Err(Error::Http(format!("404 Not Found for {url}"))),
        }
    }
}
