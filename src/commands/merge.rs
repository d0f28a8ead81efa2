use crate::assemble::PageAssembler;
use crate::document;
use crate::error::{Error, Result};
use crate::outline::{self, TransferStats};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Where the result was written; `.pdf` is appended when missing.
    pub output: PathBuf,
    pub merged: usize,
    pub skipped: usize,
    pub pages: usize,
    pub bookmarks: TransferStats,
}

/// Concatenates the pages of `inputs` in order.
///
/// Inputs that are missing, empty, unreadable or have no pages are skipped
/// with a warning. Fails without touching `output` when none are usable.
/// Each input's bookmarks follow its pages; top-level entries keep input order.
pub fn run(inputs: &[PathBuf], output: &Path, overwrite: bool) -> Result<MergeOutcome> {
    if inputs.is_empty() {
        return Err(Error::InvalidArgument("no input files provided".to_string()));
    }
    if inputs.len() == 1 {
        info!("only one input file provided, this will copy/repair the PDF");
    }

    let output = if document::has_pdf_extension(output) {
        output.to_path_buf()
    } else {
        output.with_extension("pdf")
    };
    let input_paths: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
    document::guard_output(&output, &input_paths, overwrite)?;

    let mut assembler = PageAssembler::new();
    let mut merged = 0;
    let mut skipped = 0;
    let mut bookmarks = TransferStats::default();
    for input in inputs {
        if fs::metadata(input).map(|m| m.len() == 0).unwrap_or(false) {
            warn!(input = %input.display(), "file is empty (0 bytes), skipping");
            skipped += 1;
            continue;
        }
        let doc = match document::load(input) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("{err}, skipping");
                skipped += 1;
                continue;
            }
        };
        if doc.get_pages().is_empty() {
            warn!(input = %input.display(), "document has no pages, skipping");
            skipped += 1;
            continue;
        }

        let added = assembler.append_all(&doc)?;
        info!(input = %input.display(), pages = added.len(), "added");
        let mut writer = assembler.bookmarks(added.into_iter().map(Some).collect());
        bookmarks += outline::copy_outline(&doc, &mut writer);
        merged += 1;
    }

    if merged == 0 {
        return Err(Error::InvalidArgument(
            "no valid PDF files to merge, output was not written".to_string(),
        ));
    }

    let pages = assembler.page_count();
    let mut out = assembler.finish();
    outline::link_outline(&mut out)?;
    document::save_atomic(&mut out, &output)?;
    Ok(MergeOutcome {
        output,
        merged,
        skipped,
        pages,
        bookmarks,
    })
}
