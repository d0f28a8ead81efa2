//! Error types shared by every pdfsmith operation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// An input path does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input exists but is not a readable, unencrypted PDF.
    #[error("could not read PDF '{}': {reason}", path.display())]
    UnreadableDocument { path: PathBuf, reason: String },

    /// A bookmark whose destination does not lead to a page. Recovered locally
    /// by the outline transfer; never aborts a command.
    #[error("bookmark '{title}' does not resolve to a page: {reason}")]
    UnresolvableBookmark { title: String, reason: String },

    /// Serializing the output failed.
    #[error("failed to write '{}': {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid page range '{spec}': {reason}")]
    InvalidPageRange { spec: String, reason: String },

    #[error("insert position {at} is out of bounds (expected 1 to {max})")]
    InsertPosition { at: usize, max: usize },

    #[error("output '{}' already exists, use --overwrite to replace it", .0.display())]
    OutputExists(PathBuf),

    #[error("output '{}' is also an input, use --overwrite to modify it in place", .0.display())]
    OutputIsInput(PathBuf),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("PDF structure error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn page_range(spec: &str, reason: impl Into<String>) -> Self {
        Error::InvalidPageRange {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolvable(title: &str, reason: impl Into<String>) -> Self {
        Error::UnresolvableBookmark {
            title: title.to_string(),
            reason: reason.into(),
        }
    }
}
