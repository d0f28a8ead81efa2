use crate::assemble::PageAssembler;
use crate::document;
use crate::error::{Error, Result};
use crate::outline::{self, TransferStats};
use crate::pages::{describe, parse_page_ranges};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteOutcome {
    pub inserted: usize,
    pub total: usize,
    pub bookmarks: TransferStats,
}

/// Inserts pages of `source` into `target` before page `at` (1-based;
/// `target pages + 1` appends) and writes the result to `output`.
///
/// `source_range` limits which source pages are pasted; all of them by default.
/// Both outlines are kept, the target's entries first, each following its
/// pages to their new position. Source bookmarks on pages that were not
/// pasted are dropped.
pub fn run(
    target: &Path,
    source: &Path,
    output: &Path,
    at: usize,
    source_range: Option<&str>,
    overwrite: bool,
) -> Result<PasteOutcome> {
    document::guard_output(output, &[target, source], overwrite)?;

    let target_doc = document::load(target)?;
    let source_doc = document::load(source)?;
    let target_total = target_doc.get_pages().len();
    let source_total = source_doc.get_pages().len();

    if at < 1 || at > target_total + 1 {
        return Err(Error::InsertPosition {
            at,
            max: target_total + 1,
        });
    }

    let selection = match source_range {
        _ if source_total == 0 => Vec::new(),
        Some(spec) => parse_page_ranges(spec, source_total)?,
        None => (1..=source_total).collect(),
    };
    if selection.is_empty() {
        warn!(source = %source.display(), "no source pages to paste, output will match the target");
    } else {
        info!("pasting {} before page {at}", describe(&selection));
    }

    let target_pages: Vec<usize> = (1..=target_total).collect();
    let mut assembler = PageAssembler::new();
    let target_ids = assembler.import_pages(&target_doc, &target_pages)?;
    let source_ids = assembler.import_pages(&source_doc, &selection)?;

    let mut source_slots = vec![None; source_total];
    for (&page_num, &id) in selection.iter().zip(&source_ids) {
        source_slots[page_num - 1] = Some(id);
    }
    let target_slots = target_ids.iter().copied().map(Some).collect();
    let mut bookmarks = outline::copy_outline(&target_doc, &mut assembler.bookmarks(target_slots));
    bookmarks += outline::copy_outline(&source_doc, &mut assembler.bookmarks(source_slots));

    let (before, after) = target_ids.split_at(at - 1);
    assembler.push_pages(before);
    assembler.push_pages(&source_ids);
    assembler.push_pages(after);

    let total = assembler.page_count();
    let mut out = assembler.finish();
    outline::link_outline(&mut out)?;
    document::save_atomic(&mut out, output)?;
    Ok(PasteOutcome {
        inserted: source_ids.len(),
        total,
        bookmarks,
    })
}
