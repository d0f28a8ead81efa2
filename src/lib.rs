//! Command-line PDF toolbox: crop pages, copy a table of contents between
//! documents, and extract, cut, paste, split or merge pages.
//!
//! PDF objects are read and written with [`lopdf`]; this crate supplies the
//! outline transfer, page-range parsing and page assembly on top of it.

pub mod assemble;
pub mod commands;
pub mod document;
pub mod error;
pub mod logging;
pub mod outline;
pub mod pages;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod test_support;

pub use assemble::PageAssembler;
pub use error::{Error, Result};
pub use outline::{OutlineEntry, OutlineSink, PageResolver, TransferStats};
