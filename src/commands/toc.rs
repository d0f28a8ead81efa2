use crate::assemble::PageAssembler;
use crate::document;
use crate::error::Result;
use crate::outline::{self, BookmarkWriter, PageResolver, TransferStats};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocOutcome {
    /// Pages in the output, always the destination's page count.
    pub pages: usize,
    pub bookmarks: TransferStats,
}

/// Writes `destination`'s pages with `source`'s bookmark tree to `output`,
/// or over `destination` when no output is given.
///
/// The destination's own outline is replaced. Nothing is written unless the
/// whole transfer succeeds.
pub fn run(source: &Path, destination: &Path, output: Option<&Path>) -> Result<TocOutcome> {
    let output = output.unwrap_or(destination);

    let source_doc = document::load(source)?;
    let destination_doc = document::load(destination)?;

    let entries = outline::read_outline(&source_doc)?;
    if entries.is_empty() {
        info!(source = %source.display(), "source has no bookmarks, output will have no outline");
    } else {
        info!(
            source = %source.display(),
            entries = outline::count_entries(&entries),
            "read source outline"
        );
    }

    let mut assembler = PageAssembler::new();
    assembler.append_all(&destination_doc)?;
    let pages = assembler.page_count();
    let mut out = assembler.finish();

    let resolver = PageResolver::new(&source_doc);
    let mut writer = BookmarkWriter::new(&mut out);
    let bookmarks = outline::transfer_outline(&entries, &resolver, &mut writer);
    writer.finish()?;

    document::save_atomic(&mut out, output)?;
    info!(
        output = %output.display(),
        pages,
        copied = bookmarks.copied,
        skipped = bookmarks.skipped,
        "wrote document with copied outline"
    );
    Ok(TocOutcome { pages, bookmarks })
}
