use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use console::style;
use pdfsmith::commands::crop::{DEFAULT_HEIGHT_INCHES, DEFAULT_WIDTH_INCHES};
use pdfsmith::commands::split::SplitMode;
use pdfsmith::commands::{crop, cut, extract, info, merge, paste, split, toc};
use pdfsmith::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfsmith")]
#[command(
    about = "Crop, split, merge, rearrange and re-bookmark PDFs from the command line",
    version,
    long_about = "A small PDF toolbox for the command line.\n\
                  \n\
                  Examples:\n\
                  • Quick info:   pdfsmith info report.pdf\n\
                  • Copy TOC:     pdfsmith toc original.pdf scanned.pdf -o out.pdf\n\
                  • Crop:         pdfsmith crop book.pdf trimmed.pdf --width 6 --height 9\n\
                  • Extract:      pdfsmith extract doc.pdf part.pdf -r 1-5,9-end\n\
                  • Merge:        pdfsmith merge a.pdf b.pdf -o out.pdf"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Replace existing outputs, including writing over an input
    #[arg(long, global = true)]
    overwrite: bool,

    /// More diagnostics (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the bookmarks of one PDF onto the pages of another
    #[command(
        name = "copy-toc",
        visible_alias = "toc",
        after_help = "Examples:\n  pdfsmith toc original.pdf scanned.pdf            # overwrite scanned.pdf\n  pdfsmith toc original.pdf scanned.pdf -o out.pdf"
    )]
    CopyToc {
        /// PDF whose bookmarks are copied
        source: PathBuf,
        /// PDF whose pages receive the bookmarks
        destination: PathBuf,
        /// Output file (defaults to overwriting the destination)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Crop every page to a centred box of the given size
    Crop {
        input: PathBuf,
        output: PathBuf,
        /// Target width in inches
        #[arg(long, default_value_t = DEFAULT_WIDTH_INCHES)]
        width: f32,
        /// Target height in inches
        #[arg(long, default_value_t = DEFAULT_HEIGHT_INCHES)]
        height: f32,
    },

    /// Copy a range of pages into a new PDF
    #[command(visible_alias = "x")]
    Extract {
        input: PathBuf,
        output: PathBuf,
        /// Pages to keep, e.g. "1-5,7,9-end" or "all"
        #[arg(short, long, value_name = "PAGES")]
        range: String,
    },

    /// Remove a range of pages
    Cut {
        input: PathBuf,
        output: PathBuf,
        /// Pages to remove, e.g. "1-3,5"
        #[arg(short, long, value_name = "PAGES")]
        range: String,
    },

    /// Insert pages of one PDF into another
    #[command(
        after_help = "Examples:\n  pdfsmith paste book.pdf plates.pdf out.pdf --at 1          # prepend\n  pdfsmith paste book.pdf plates.pdf out.pdf --at 12 -s 2-3"
    )]
    Paste {
        /// PDF to paste into
        target: PathBuf,
        /// PDF to take pages from
        source: PathBuf,
        output: PathBuf,
        /// Target page before which pages are inserted (pages + 1 appends)
        #[arg(long, value_name = "PAGE")]
        at: usize,
        /// Source pages to paste (default: all)
        #[arg(short, long, value_name = "PAGES")]
        source_range: Option<String>,
    },

    /// Split a PDF into several files
    #[command(
        visible_alias = "s",
        after_help = "Examples:\n  pdfsmith split doc.pdf parts/                          # one file per page\n  pdfsmith split doc.pdf parts/ --mode ranges --ranges '1-3;4-5;6-end'"
    )]
    Split {
        input: PathBuf,
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = SplitModeArg::EachPage)]
        mode: SplitModeArg,
        /// Semicolon separated ranges, one output file each
        #[arg(long, value_name = "RANGES", required_if_eq("mode", "ranges"))]
        ranges: Option<String>,
    },

    /// Concatenate PDFs
    #[command(
        visible_alias = "m",
        after_help = "Examples:\n  pdfsmith merge a.pdf b.pdf -o out.pdf\n  pdfsmith m *.pdf -o merged.pdf"
    )]
    Merge {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long, default_value = "merged.pdf")]
        output: PathBuf,
    },

    /// Show page count, metadata and bookmarks
    #[command(visible_alias = "i")]
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Search directories for PDFs
        #[arg(short, long)]
        recursive: bool,

        /// Print the bookmark tree
        #[arg(long)]
        outline: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitModeArg {
    EachPage,
    Ranges,
}

impl From<SplitModeArg> for SplitMode {
    fn from(mode: SplitModeArg) -> Self {
        match mode {
            SplitModeArg::EachPage => SplitMode::EachPage,
            SplitModeArg::Ranges => SplitMode::Ranges,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.quiet { -1 } else { cli.verbose as i8 });
    let overwrite = cli.overwrite;

    match cli.command {
        Commands::CopyToc {
            source,
            destination,
            output,
        } => {
            let target = output.clone().unwrap_or_else(|| destination.clone());
            let outcome = toc::run(&source, &destination, output.as_deref()).with_context(|| {
                format!(
                    "Failed to copy bookmarks from {} to {}",
                    source.display(),
                    destination.display()
                )
            })?;
            println!(
                "{} Copied {} bookmark(s) onto {} page(s): {}",
                style("✓").green(),
                outcome.bookmarks.copied,
                outcome.pages,
                target.display()
            );
            if outcome.bookmarks.skipped > 0 {
                println!(
                    "{} Skipped {} bookmark(s) without a valid page",
                    style("⚠️").yellow(),
                    outcome.bookmarks.skipped
                );
            }
        }
        Commands::Crop {
            input,
            output,
            width,
            height,
        } => {
            let outcome = crop::run(&input, &output, width, height, overwrite)
                .with_context(|| format!("Failed to crop {}", input.display()))?;
            println!(
                "{} Cropped {} of {} page(s): {}",
                style("✓").green(),
                outcome.cropped,
                outcome.pages,
                output.display()
            );
        }
        Commands::Extract {
            input,
            output,
            range,
        } => {
            let pages = extract::run(&input, &output, &range, overwrite)
                .with_context(|| format!("Failed to extract pages from {}", input.display()))?;
            println!(
                "{} Extracted {} page(s): {}",
                style("✓").green(),
                pages,
                output.display()
            );
        }
        Commands::Cut {
            input,
            output,
            range,
        } => {
            let outcome = cut::run(&input, &output, &range, overwrite)
                .with_context(|| format!("Failed to cut pages from {}", input.display()))?;
            println!(
                "{} Removed {} page(s), kept {}: {}",
                style("✓").green(),
                outcome.removed,
                outcome.kept,
                output.display()
            );
        }
        Commands::Paste {
            target,
            source,
            output,
            at,
            source_range,
        } => {
            let outcome = paste::run(
                &target,
                &source,
                &output,
                at,
                source_range.as_deref(),
                overwrite,
            )
            .with_context(|| {
                format!(
                    "Failed to paste {} into {}",
                    source.display(),
                    target.display()
                )
            })?;
            println!(
                "{} Pasted {} page(s), {} in total, {} bookmark(s): {}",
                style("✓").green(),
                outcome.inserted,
                outcome.total,
                outcome.bookmarks.copied,
                output.display()
            );
        }
        Commands::Split {
            input,
            output_dir,
            mode,
            ranges,
        } => {
            let written = split::run(&input, &output_dir, mode.into(), ranges.as_deref(), overwrite)
                .with_context(|| format!("Failed to split {}", input.display()))?;
            println!(
                "{} Wrote {} file(s) to {}",
                style("✓").green(),
                written.len(),
                output_dir.display()
            );
        }
        Commands::Merge { inputs, output } => {
            let outcome = merge::run(&inputs, &output, overwrite).context("Failed to merge PDFs")?;
            println!(
                "{} Merged {} PDF(s), {} page(s), {} bookmark(s): {}",
                style("✓").green(),
                outcome.merged,
                outcome.pages,
                outcome.bookmarks.copied,
                outcome.output.display()
            );
        }
        Commands::Info {
            files,
            recursive,
            outline,
        } => show_info(&files, recursive, outline)?,
    }
    Ok(())
}

fn show_info(files: &[PathBuf], recursive: bool, show_outline: bool) -> Result<()> {
    let pdf_files = info::collect_pdfs(files, recursive)?;

    let mut total_pages = 0;
    for file in &pdf_files {
        match info::summarize(file) {
            Ok(summary) => {
                print_summary(&summary, show_outline);
                total_pages += summary.pages;
            }
            Err(e) => eprintln!("Error reading {}: {}", file.display(), e),
        }
        if pdf_files.len() > 1 {
            println!();
        }
    }

    if pdf_files.len() > 1 {
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("Total: {} PDF(s), {} page(s)", pdf_files.len(), total_pages);
    }
    Ok(())
}

fn print_summary(summary: &info::PdfSummary, show_outline: bool) {
    println!("📄 {}", style(summary.path.display()).bold());
    println!("   Pages: {}", summary.pages);
    println!("   Version: {}", summary.version);
    if let Some(title) = &summary.title {
        println!("   Title: {}", title);
    }
    if let Some(author) = &summary.author {
        println!("   Author: {}", author);
    }
    if let Some(subject) = &summary.subject {
        println!("   Subject: {}", subject);
    }

    let numbers = &summary.page_numbers;
    if !numbers.is_empty() {
        if numbers.len() <= 10 {
            println!("   Page numbers: {:?}", numbers);
        } else {
            println!(
                "   Page numbers: {} to {}",
                numbers[0],
                numbers[numbers.len() - 1]
            );
        }
    }

    if !summary.outline.is_empty() {
        println!(
            "   Bookmarks: {} ({} top-level)",
            summary.outline.len(),
            summary.top_level_bookmarks()
        );
    }
    if show_outline {
        for line in &summary.outline {
            let page = line
                .page
                .map(|p| format!(" (p. {})", p))
                .unwrap_or_else(|| style(" (no page)").dim().to_string());
            println!("     {}{}{}", "  ".repeat(line.level), line.title, page);
        }
    }
}
