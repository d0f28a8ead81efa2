use crate::assemble::PageAssembler;
use crate::document;
use crate::error::{Error, Result};
use crate::pages::{describe, parse_page_ranges};
use std::path::Path;
use tracing::{info, warn};

/// Copies the pages selected by `range` into a new document at `output`.
/// Returns the number of pages written.
///
/// Writing back over the input is refused even with `overwrite`.
pub fn run(input: &Path, output: &Path, range: &str, overwrite: bool) -> Result<usize> {
    if document::same_file(input, output) {
        return Err(Error::InvalidArgument(format!(
            "input and output are the same file ('{}'), choose a different output",
            output.display()
        )));
    }
    document::guard_output(output, &[], overwrite)?;

    let doc = document::load(input)?;
    let total = doc.get_pages().len();
    let selection = parse_page_ranges(range, total)?;
    if selection.is_empty() {
        warn!(input = %input.display(), range, "no pages selected, output will be empty");
    } else {
        info!("extracting {} of {total}", describe(&selection));
    }

    let mut assembler = PageAssembler::new();
    assembler.append_pages(&doc, &selection)?;
    let mut out = assembler.finish();
    document::save_atomic(&mut out, output)?;
    Ok(selection.len())
}
