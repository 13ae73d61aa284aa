mod common;

use std::fs;

use common::{JPG_BYTES, PNG_BYTES, StubFetcher, sample_epub};
use epub2md::dom::{outer_html, parse_html};
use epub2md::export::{
    ImageContext, extract_manifest_images, localize, localize_dom, localize_markdown,
};
use epub2md::{Converter, ExportOptions, TagPolicy};
use tempfile::TempDir;

#[test]
fn test_localize_internal_reference() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let fetcher = StubFetcher::failing();
    let ctx = ImageContext::new(dir.path(), book.archive(), book.root_dir(), &fetcher);

    let localized = localize("img/pic.png", &ctx);
    assert_eq!(localized.reference, "./images/pic.png");
    let written = localized.written.expect("should write a file");
    assert_eq!(written, dir.path().join("pic.png"));
    assert_eq!(fs::read(&written).unwrap(), PNG_BYTES);
    assert!(fetcher.requests.borrow().is_empty());
}

#[test]
fn test_localize_remote_reference() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let fetcher = StubFetcher::serving(JPG_BYTES);
    let ctx = ImageContext::new(dir.path(), book.archive(), book.root_dir(), &fetcher);

    let localized = localize("https://example.com/remote/photo.jpg?w=300", &ctx);
    assert_eq!(localized.reference, "./images/photo.jpg");
    assert_eq!(fs::read(dir.path().join("photo.jpg")).unwrap(), JPG_BYTES);
    assert_eq!(
        *fetcher.requests.borrow(),
        vec!["https://example.com/remote/photo.jpg?w=300".to_string()]
    );
}

#[test]
fn test_remote_without_file_name_gets_generated_name() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let fetcher = StubFetcher::serving(JPG_BYTES);
    let ctx = ImageContext::new(dir.path(), book.archive(), book.root_dir(), &fetcher);

    let localized = localize("https://example.com/", &ctx);
    let name = localized.reference.strip_prefix("./images/").unwrap();
    assert!(name.starts_with("image_") && name.ends_with(".jpg"), "{name}");
    assert!(dir.path().join(name).exists());
}

#[test]
fn test_failures_leave_reference_unchanged() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let fetcher = StubFetcher::failing();
    let ctx = ImageContext::new(dir.path(), book.archive(), book.root_dir(), &fetcher);

    let remote = localize("https://example.com/gone.png", &ctx);
    assert_eq!(remote.reference, "https://example.com/gone.png");
    assert_eq!(remote.written, None);

    let missing = localize("img/missing.png", &ctx);
    assert_eq!(missing.reference, "img/missing.png");
    assert_eq!(missing.written, None);

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_local_references_are_never_touched() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let fetcher = StubFetcher::serving(JPG_BYTES);
    let ctx = ImageContext::new(dir.path(), book.archive(), book.root_dir(), &fetcher);

    for reference in ["./images/a.png", "../img/pic.png", "/img/pic.png", ""] {
        let localized = localize(reference, &ctx);
        assert_eq!(localized.reference, reference);
        assert_eq!(localized.written, None);
    }
    assert!(fetcher.requests.borrow().is_empty());
}

#[test]
fn test_localize_dom_rewrites_img_src() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let fetcher = StubFetcher::serving(JPG_BYTES);
    let ctx = ImageContext::new(dir.path(), book.archive(), book.root_dir(), &fetcher);

    let mut dom = parse_html(
        r#"<p><img src="img/pic.png" alt="a"><img src="https://x.test/p/q.jpg"><img src="img/none.png"></p>"#,
    );
    let written = localize_dom(&mut dom, &ctx);
    assert_eq!(written.len(), 2);

    let p = dom.find_by_tag("p").unwrap();
    assert_eq!(
        outer_html(&dom, p),
        r#"<p><img src="./images/pic.png" alt="a"><img src="./images/q.jpg"><img src="img/none.png"></p>"#
    );
}

#[test]
fn test_localize_markdown_rewrites_image_links() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let fetcher = StubFetcher::serving(JPG_BYTES);
    let ctx = ImageContext::new(dir.path(), book.archive(), book.root_dir(), &fetcher);

    let text = "Intro ![Pic](img/pic.png) and ![](https://x.test/r.jpg).\n\
                Keep ![x](./local.png), ![gone](img/gone.png) and [link](img/pic.png).";
    let out = localize_markdown(text, &ctx);

    assert_eq!(
        out,
        "Intro ![Pic](./images/pic.png) and ![](./images/r.jpg).\n\
         Keep ![x](./local.png), ![gone](img/gone.png) and [link](img/pic.png)."
    );
}

#[test]
fn test_extract_manifest_images_skips_missing_items() {
    let dir = TempDir::new().unwrap();
    let media = dir.path().join("images");
    let book = sample_epub().open().unwrap();

    let written = extract_manifest_images(&book, &media).unwrap();
    assert_eq!(written, vec![media.join("pic.png")]);
    assert_eq!(fs::read(media.join("pic.png")).unwrap(), PNG_BYTES);
    assert!(!media.join("ghost.jpg").exists());
}

#[test]
fn test_convert_with_localized_images() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("md");
    let book = sample_epub().open().unwrap();

    let files = Converter::new(&book)
        .with_fetcher(StubFetcher::serving(JPG_BYTES))
        .convert_to_markdown(
            &ExportOptions::new()
                .with_output_dir(&out)
                .with_localize_images(true),
        )
        .unwrap();

    let images = out.join("images");
    assert_eq!(fs::read(images.join("pic.png")).unwrap(), PNG_BYTES);
    assert_eq!(fs::read(images.join("photo.jpg")).unwrap(), JPG_BYTES);

    let ch1 = fs::read_to_string(&files[1]).unwrap();
    assert!(ch1.contains(r#"<img src="./images/pic.png" alt="A picture">"#));
    assert!(ch1.contains(r#"<img src="./images/photo.jpg" alt="Remote">"#));
    assert!(ch1.contains(r#"<img src="./already/local.png" alt="Local">"#));
    assert!(ch1.contains(r#"<img src="img/missing.png" alt="Missing">"#));
}

#[test]
fn test_convert_with_failing_downloads_still_succeeds() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("merged.md");
    let book = sample_epub().open().unwrap();

    let path = Converter::new(&book)
        .with_fetcher(StubFetcher::failing())
        .convert_to_single_markdown(
            &ExportOptions::new()
                .with_output_filename(&target)
                .with_localize_images(true)
                .with_tag_policy(TagPolicy::markdown_only()),
        )
        .expect("image failures must not abort the export");

    let merged = fs::read_to_string(path).unwrap();
    assert!(merged.contains("![A picture](./images/pic.png)"));
    assert!(merged.contains("![Remote](https://example.com/remote/photo.jpg)"));
    assert!(merged.contains("![Missing](img/missing.png)"));
    assert!(dir.path().join("images").join("pic.png").exists());
}
