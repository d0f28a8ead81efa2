use crate::assemble::PageAssembler;
use crate::document;
use crate::error::{Error, Result};
use crate::pages::{describe, parse_page_ranges};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutOutcome {
    pub kept: usize,
    pub removed: usize,
}

/// Writes every page of `input` that `range` does not select.
///
/// When nothing is removed the input is copied byte for byte (or left alone
/// when cutting in place).
pub fn run(input: &Path, output: &Path, range: &str, overwrite: bool) -> Result<CutOutcome> {
    document::guard_output(output, &[input], overwrite)?;
    let in_place = document::same_file(input, output);

    let doc = document::load(input)?;
    let total = doc.get_pages().len();
    let selection = parse_page_ranges(range, total)?;
    let removed: HashSet<usize> = selection.iter().copied().collect();
    let keep: Vec<usize> = (1..=total).filter(|page| !removed.contains(page)).collect();

    if keep.len() == total {
        info!(input = %input.display(), "no pages to cut, document is unchanged");
        if !in_place {
            fs::copy(input, output).map_err(|source| Error::WriteFailure {
                path: output.to_path_buf(),
                source,
            })?;
        }
        return Ok(CutOutcome {
            kept: total,
            removed: 0,
        });
    }

    if keep.is_empty() {
        warn!(input = %input.display(), "every page was cut, output will be empty");
    } else {
        info!("removing {} of {total}", describe(&selection));
    }

    let mut assembler = PageAssembler::new();
    assembler.append_pages(&doc, &keep)?;
    let mut out = assembler.finish();
    document::save_atomic(&mut out, output)?;
    Ok(CutOutcome {
        kept: keep.len(),
        removed: total - keep.len(),
    })
}
