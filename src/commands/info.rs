//! Quick document summaries.

use crate::document::{self, deref, has_pdf_extension};
use crate::error::{Error, Result};
use crate::outline::{self, PageResolver, decode_text};
use lopdf::{Document, Object};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct OutlineLine {
    pub level: usize,
    pub title: String,
    /// 1-based target page, if the bookmark resolves.
    pub page: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PdfSummary {
    pub path: PathBuf,
    pub pages: usize,
    pub version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub page_numbers: Vec<u32>,
    pub outline: Vec<OutlineLine>,
}

impl PdfSummary {
    pub fn top_level_bookmarks(&self) -> usize {
        self.outline.iter().filter(|line| line.level == 0).count()
    }
}

pub fn summarize(path: &Path) -> Result<PdfSummary> {
    let doc = document::load(path)?;
    let pages = doc.get_pages();
    let page_numbers: Vec<u32> = pages.keys().copied().collect();

    let entries = outline::read_outline(&doc)?;
    let resolver = PageResolver::new(&doc);
    let outline = outline::flatten(&entries)
        .into_iter()
        .map(|(level, entry)| OutlineLine {
            level,
            title: entry.title.clone(),
            page: resolver.resolve(entry).ok().map(|index| index + 1),
        })
        .collect();

    Ok(PdfSummary {
        path: path.to_path_buf(),
        pages: pages.len(),
        version: doc.version.clone(),
        title: info_string(&doc, b"Title"),
        author: info_string(&doc, b"Author"),
        subject: info_string(&doc, b"Subject"),
        page_numbers,
        outline,
    })
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = deref(doc, doc.trailer.get(b"Info").ok()?).as_dict().ok()?;
    let value = deref(doc, info.get(key).ok()?);
    matches!(value, Object::String(..)).then(|| decode_text(value))
}

/// Expands `paths` into the PDF files to summarize.
///
/// Directories are searched (recursively) only when `recursive` is set.
pub fn collect_pdfs(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut pdf_files = Vec::new();
    let mut visited_dirs = HashSet::new();
    for path in paths {
        if recursive && path.is_dir() {
            collect_pdfs_recursive(path, &mut pdf_files, &mut visited_dirs);
        } else if path.is_file() {
            if !has_pdf_extension(path) {
                return Err(Error::InvalidArgument(format!(
                    "non-PDF file provided: {}",
                    path.display()
                )));
            }
            pdf_files.push(path.clone());
        } else if path.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "'{}' is a directory, use -r/--recursive to search subdirectories",
                path.display()
            )));
        } else {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    if pdf_files.is_empty() {
        return Err(Error::InvalidArgument("no PDF files found".to_string()));
    }
    pdf_files.sort();
    Ok(pdf_files)
}

fn collect_pdfs_recursive(dir: &Path, pdfs: &mut Vec<PathBuf>, visited: &mut HashSet<PathBuf>) {
    // Canonical paths catch symlink loops.
    let canonical_dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    if !visited.insert(canonical_dir) {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), "cannot read directory: {e}");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), "invalid directory entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            collect_pdfs_recursive(&path, pdfs, visited);
        } else if path.is_file() && has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }
}
