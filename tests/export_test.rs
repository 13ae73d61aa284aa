mod common;

use std::fs;
use std::path::PathBuf;

use common::{EpubBuilder, sample_epub, xhtml};
use epub2md::export::{default_merged_path, default_output_dir};
use epub2md::{Converter, ExportOptions, Publication, TagPolicy};
use tempfile::TempDir;

fn file_names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_convert_to_markdown_one_file_per_section() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let book = sample_epub().open().unwrap();

    let files = Converter::new(&book)
        .convert_to_markdown(&ExportOptions::new().with_output_dir(&out))
        .expect("conversion failed");

    assert_eq!(file_names(&files), vec!["1-Cover.md", "2-Chapter_One.md", "3-ch2.md"]);
    for file in &files {
        assert!(file.starts_with(&out));
        assert!(file.exists());
    }
    assert!(!out.join("images").exists(), "images/ is only created when localizing");

    let ch1 = fs::read_to_string(&files[1]).unwrap();
    assert!(ch1.starts_with("# Chapter One\n\nIt was a _dark_ and **stormy** night."));
    assert!(ch1.contains("## A Section\n\n- First\n- Second"));
    // Images are kept as raw HTML and untouched without localization.
    assert!(ch1.contains(r#"<img src="img/pic.png" alt="A picture">"#));
    assert!(ch1.contains("https://example.com/remote/photo.jpg"));
    assert!(ch1.ends_with('\n'));
    assert!(!ch1.contains("\n\n\n"));

    let ch2 = fs::read_to_string(&files[2]).unwrap();
    assert_eq!(ch2, "# Chapter Two\n\nThe end.\n");
}

#[test]
fn test_file_number_width_follows_section_count() {
    let mut manifest = String::new();
    let mut spine = String::new();
    let mut builder = EpubBuilder::new().container("content.opf");
    for i in 1..=10 {
        manifest.push_str(&format!(
            r#"<item id="c{i}" href="c{i}.xhtml" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="c{i}"/>"#));
        builder = builder.file(&format!("c{i}.xhtml"), xhtml(&format!("Part {i}"), "<p>x</p>"));
    }
    let opf = format!(
        "<package><metadata/><manifest>{manifest}</manifest><spine>{spine}</spine></package>"
    );
    let book = builder.file("content.opf", opf).open().unwrap();

    let dir = TempDir::new().unwrap();
    let files = Converter::new(&book)
        .convert_to_markdown(&ExportOptions::new().with_output_dir(dir.path()))
        .unwrap();

    let names = file_names(&files);
    assert_eq!(names.len(), 10);
    assert_eq!(names[0], "01-Part_1.md");
    assert_eq!(names[8], "09-Part_9.md");
    assert_eq!(names[9], "10-Part_10.md");
}

#[test]
fn test_convert_to_single_markdown() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested").join("book.md");
    let book = sample_epub().open().unwrap();

    let path = Converter::new(&book)
        .convert_to_single_markdown(&ExportOptions::new().with_output_filename(&target))
        .expect("merge failed");
    assert_eq!(path, target);

    let merged = fs::read_to_string(&path).unwrap();
    assert!(merged.starts_with("# Cover\n\n"));
    assert!(merged.contains("\n\n---\n\n# Chapter One\n\n# Chapter One\n\nIt was"));
    assert!(merged.contains("\n\n---\n\n# ch2\n\n# Chapter Two\n\nThe end."));
    assert_eq!(merged.matches("\n\n---\n\n").count(), 2);
    assert!(merged.ends_with("The end.\n"));
    assert!(!target.parent().unwrap().join("images").exists());
}

#[test]
fn test_default_destinations_next_to_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("novel.epub");
    sample_epub().write_to(&input);
    let book = Publication::open(&input).unwrap();
    let converter = Converter::new(&book);

    let files = converter.convert_to_markdown(&ExportOptions::default()).unwrap();
    let expected_dir = dir.path().join("novel_markdown");
    assert_eq!(default_output_dir(&input), expected_dir);
    assert!(files.iter().all(|f| f.parent() == Some(expected_dir.as_path())));

    let merged = converter.convert_to_single_markdown(&ExportOptions::default()).unwrap();
    assert_eq!(merged, dir.path().join("novel_merged.md"));
    assert_eq!(default_merged_path(&input), merged);
    assert!(merged.exists());
}

#[test]
fn test_markdown_only_policy_renders_image_links() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();

    let options = ExportOptions::new()
        .with_output_dir(dir.path())
        .with_tag_policy(TagPolicy::markdown_only());
    let files = Converter::new(&book).convert_to_markdown(&options).unwrap();

    let ch1 = fs::read_to_string(&files[1]).unwrap();
    assert!(ch1.contains("![A picture](img/pic.png)"));
    assert!(ch1.contains("![Local](./already/local.png)"));
}

#[test]
fn test_render_section_in_memory() {
    let book = sample_epub().open().unwrap();
    let converter = Converter::new(&book);

    let md = converter.render_section(&book.sections()[2], None, &TagPolicy::default());
    assert_eq!(md, "# Chapter Two\n\nThe end.");
}

#[test]
fn test_export_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let book = sample_epub().open().unwrap();
    let converter = Converter::new(&book);
    let options = ExportOptions::new().with_output_dir(dir.path());

    let first = converter.convert_to_markdown(&options).unwrap();
    let before = fs::read_to_string(&first[1]).unwrap();
    let second = converter.convert_to_markdown(&options).unwrap();

    assert_eq!(first, second);
    assert_eq!(before, fs::read_to_string(&second[1]).unwrap());
}
