//! epub2md - Convert EPUB ebooks to Markdown

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use epub2md::export::default_output_dir;
use epub2md::{Converter, ExportOptions, Metadata, Publication, TocNode};

#[derive(Parser)]
#[command(name = "epub2md")]
#[command(version, about = "Convert EPUB ebooks to Markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub2md book.epub                 One file per section in book_markdown/
    epub2md -s book.epub              Single merged file book_merged.md
    epub2md -l -o out book.epub       Copy images to out/images and rewrite links
    epub2md -i book.epub              Show book metadata and table of contents")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory, or output file with --single
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Merge all sections into one Markdown file
    #[arg(short, long)]
    single: bool,

    /// Copy images next to the output and rewrite references
    #[arg(short, long)]
    localize_images: bool,

    /// Timeout in seconds for downloading remote images
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Show book metadata without converting
    #[arg(short, long)]
    info: bool,

    /// Print --info output as JSON
    #[arg(long, requires = "info")]
    json: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,

    /// Log progress for every file
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = if cli.info {
        show_info(&cli.input, cli.json)
    } else {
        convert(&cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn convert(cli: &Cli) -> epub2md::Result<()> {
    let book = Publication::open(&cli.input)?;
    let converter = Converter::new(&book);

    let mut options = ExportOptions::new()
        .with_localize_images(cli.localize_images)
        .with_http_timeout(Duration::from_secs(cli.timeout));

    if cli.single {
        if let Some(path) = &cli.output {
            options = options.with_output_filename(path);
        }
        let path = converter.convert_to_single_markdown(&options)?;
        if !cli.quiet {
            println!("Converted {} -> {}", cli.input.display(), path.display());
        }
    } else {
        if let Some(dir) = &cli.output {
            options = options.with_output_dir(dir);
        }
        let files = converter.convert_to_markdown(&options)?;
        if !cli.quiet {
            let dir = cli
                .output
                .clone()
                .unwrap_or_else(|| default_output_dir(&cli.input));
            println!(
                "Converted {} -> {} ({} files)",
                cli.input.display(),
                dir.display(),
                files.len()
            );
        }
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct InfoReport<'a> {
    file: &'a Path,
    metadata: &'a Metadata,
    sections: usize,
    spine: usize,
    toc: &'a [TocNode],
}

fn show_info(path: &Path, json: bool) -> epub2md::Result<()> {
    let book = Publication::open(path)?;

    if json {
        let report = InfoReport {
            file: path,
            metadata: book.metadata(),
            sections: book.sections().len(),
            spine: book.spine().len(),
            toc: book.toc(),
        };
        let out = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
        println!("{out}");
        return Ok(());
    }

    let meta = book.metadata();
    println!("File: {}", path.display());
    let fields = [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Language", &meta.language),
        ("Publisher", &meta.publisher),
        ("Identifier", &meta.identifier),
        ("Date", &meta.date),
        ("Rights", &meta.rights),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    if let Some(desc) = &meta.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &desc[..cut]),
            None => println!("Description: {desc}"),
        }
    }
    println!("Sections: {}", book.sections().len());

    let toc = book.toc();
    let entries: usize = toc.iter().map(TocNode::count).sum();
    println!("TOC entries: {entries}");
    for node in toc {
        print_toc(node, 1);
    }

    Ok(())
}

fn print_toc(node: &TocNode, depth: usize) {
    let name = node.name.as_deref().unwrap_or("(untitled)");
    match &node.path {
        Some(path) => println!("{}- {name} ({path})", "  ".repeat(depth)),
        None => println!("{}- {name}", "  ".repeat(depth)),
    }
    for child in &node.children {
        print_toc(child, depth + 1);
    }
}
