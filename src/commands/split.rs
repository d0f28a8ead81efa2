use crate::assemble::PageAssembler;
use crate::document;
use crate::error::{Error, Result};
use crate::pages::parse_page_ranges;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// One output file per page.
    #[default]
    EachPage,
    /// One output file per `;`-separated range.
    Ranges,
}

/// Splits `input` into several PDFs inside `output_dir` and returns the
/// files written.
///
/// Existing files are skipped with a warning unless `overwrite` is set.
pub fn run(
    input: &Path,
    output_dir: &Path,
    mode: SplitMode,
    ranges: Option<&str>,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let doc = document::load(input)?;
    let total = doc.get_pages().len();
    if total == 0 {
        warn!(input = %input.display(), "document has no pages, nothing to split");
        return Ok(Vec::new());
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "split".to_string());
    let jobs = plan(&stem, output_dir, mode, ranges, total)?;

    fs::create_dir_all(output_dir).map_err(|source| Error::WriteFailure {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(jobs.len());
    for (path, pages) in jobs {
        if path.exists() && !overwrite {
            warn!(path = %path.display(), "output already exists, skipping (use --overwrite)");
            continue;
        }
        let mut assembler = PageAssembler::new();
        assembler.append_pages(&doc, &pages)?;
        let mut out = assembler.finish();
        document::save_atomic(&mut out, &path)?;
        debug!(path = %path.display(), pages = pages.len(), "wrote part");
        written.push(path);
    }

    info!(
        input = %input.display(),
        parts = written.len(),
        "split into {}",
        output_dir.display()
    );
    Ok(written)
}

/// Output path and page list of every part, validated before anything is written.
fn plan(
    stem: &str,
    output_dir: &Path,
    mode: SplitMode,
    ranges: Option<&str>,
    total: usize,
) -> Result<Vec<(PathBuf, Vec<usize>)>> {
    match mode {
        SplitMode::EachPage => Ok((1..=total)
            .map(|page| (output_dir.join(format!("{stem}_page_{page:03}.pdf")), vec![page]))
            .collect()),
        SplitMode::Ranges => {
            let spec = ranges.ok_or_else(|| {
                Error::InvalidArgument("split by ranges needs a --ranges specification".to_string())
            })?;
            let mut jobs = Vec::new();
            for (index, part) in spec.split(';').enumerate() {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let pages = parse_page_ranges(part, total)?;
                if pages.is_empty() {
                    warn!(range = part, "range selects no pages, skipping");
                    continue;
                }
                let name = format!("{stem}_range_{}_{}.pdf", index + 1, sanitize(part));
                jobs.push((output_dir.join(name), pages));
            }
            Ok(jobs)
        }
    }
}

fn sanitize(range: &str) -> String {
    range
        .replace('-', "_to_")
        .replace(',', "_")
        .replace(char::is_whitespace, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_page_names_are_zero_padded() {
        let jobs = plan("doc", Path::new("out"), SplitMode::EachPage, None, 3).unwrap();
        let names: Vec<String> = jobs
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["doc_page_001.pdf", "doc_page_002.pdf", "doc_page_003.pdf"]);
    }

    #[test]
    fn ranges_are_numbered_by_position() {
        let jobs = plan("doc", Path::new("out"), SplitMode::Ranges, Some("1-3; ;4, 6-end"), 8).unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].0.ends_with("doc_range_1_1_to_3.pdf"));
        assert_eq!(jobs[0].1, vec![1, 2, 3]);
        assert!(jobs[1].0.ends_with("doc_range_3_4_6_to_end.pdf"));
        assert_eq!(jobs[1].1, vec![4, 6, 7, 8]);
    }

    #[test]
    fn ranges_mode_requires_a_spec() {
        assert!(matches!(
            plan("doc", Path::new("out"), SplitMode::Ranges, None, 3),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn invalid_range_fails_before_writing() {
        assert!(matches!(
            plan("doc", Path::new("out"), SplitMode::Ranges, Some("1-2;9"), 3),
            Err(Error::InvalidPageRange { .. })
        ));
    }
}
