//! Loading and saving documents, and the output-path rules every command shares.

use crate::error::{Error, Result};
use lopdf::{Document, Object, ObjectId};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Loads `path`, classifying failures as missing or unreadable.
pub fn load(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(Error::UnreadableDocument {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    let doc = Document::load(path).map_err(|e| Error::UnreadableDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    // lopdf opens empty-password files transparently; they still count.
    if doc.is_encrypted() || doc.was_encrypted() {
        return Err(Error::UnreadableDocument {
            path: path.to_path_buf(),
            reason: "document is encrypted".to_string(),
        });
    }

    debug!(path = %path.display(), pages = doc.get_pages().len(), "loaded document");
    Ok(doc)
}

/// Serializes `doc` next to `path` and renames it into place.
///
/// The temporary file is deleted on every failure path, so an existing file
/// at `path` is either fully replaced or left untouched.
pub fn save_atomic(doc: &mut Document, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_failure = |source: io::Error| Error::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failure)?;
    doc.save_to(&mut tmp)
        .map_err(|e| write_failure(io::Error::other(e.to_string())))?;
    tmp.as_file().sync_all().map_err(write_failure)?;
    tmp.persist(path).map_err(|e| write_failure(e.error))?;

    debug!(path = %path.display(), "saved document");
    Ok(())
}

/// Whether two paths name the same file, falling back to lexical comparison
/// of absolute paths when either does not exist yet.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => absolute(a) == absolute(b),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Refuses to clobber an existing output or one of the inputs unless
/// `overwrite` is set.
pub fn guard_output(output: &Path, inputs: &[&Path], overwrite: bool) -> Result<()> {
    if inputs.iter().any(|input| same_file(input, output)) {
        if overwrite {
            return Ok(());
        }
        return Err(Error::OutputIsInput(output.to_path_buf()));
    }
    if output.exists() && !overwrite {
        return Err(Error::OutputExists(output.to_path_buf()));
    }
    Ok(())
}

/// Page trees and reference chains deeper than this are treated as cyclic.
const MAX_TREE_DEPTH: usize = 64;

/// Looks up `key` on a page, walking up through `/Parent` for inherited
/// attributes. Returns the node carrying the value alongside the value.
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<(ObjectId, &'a Object)> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some((node_id, value));
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Follows indirect references until a direct object is reached.
///
/// A dangling reference is returned as it is.
pub fn deref<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..MAX_TREE_DEPTH {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => obj = next,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

/// Case-insensitive `.pdf` extension check.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.pdf");
        match load(&missing) {
            Err(Error::FileNotFound(path)) => assert_eq!(path, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn load_reports_garbage_as_unreadable() {
        let dir = TempDir::new().unwrap();
        let junk = dir.path().join("junk.pdf");
        fs::write(&junk, b"this is not a pdf").unwrap();
        assert!(matches!(load(&junk), Err(Error::UnreadableDocument { .. })));
    }

    #[test]
    fn load_rejects_encrypted_documents() {
        let dir = TempDir::new().unwrap();
        let mut doc = crate::test_support::sample_document(1);
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::string_literal(vec![7u8; 16]),
                Object::string_literal(vec![9u8; 16]),
            ]),
        );
        let version = lopdf::EncryptionVersion::V2 {
            document: &doc,
            owner_password: "",
            user_password: "",
            key_length: 128,
            permissions: lopdf::Permissions::all(),
        };
        let state = lopdf::EncryptionState::try_from(version).unwrap();
        doc.encrypt(&state).unwrap();
        let path = dir.path().join("locked.pdf");
        doc.save(&path).unwrap();

        match load(&path) {
            Err(Error::UnreadableDocument { reason, .. }) => assert!(reason.contains("encrypted")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn save_into_missing_directory_is_a_write_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("no-such-dir").join("out.pdf");
        let mut doc = crate::test_support::sample_document(1);

        match save_atomic(&mut doc, &target) {
            Err(Error::WriteFailure { path, .. }) => assert_eq!(path, target),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!dir.path().join("no-such-dir").exists());
    }

    #[test]
    fn failed_save_leaves_existing_target_alone() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by the renamed file.
        let target = dir.path().join("out.pdf");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), b"precious").unwrap();
        let mut doc = crate::test_support::sample_document(2);

        assert!(matches!(
            save_atomic(&mut doc, &target),
            Err(Error::WriteFailure { .. })
        ));
        assert_eq!(fs::read(target.join("keep.txt")).unwrap(), b"precious");
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temporary file was not cleaned up");
    }

    #[test]
    fn save_replaces_existing_file_whole() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.pdf");
        fs::write(&target, b"old contents").unwrap();
        let mut doc = crate::test_support::sample_document(2);

        save_atomic(&mut doc, &target).unwrap();
        assert_eq!(load(&target).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn guard_rejects_existing_output_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        fs::write(&input, b"x").unwrap();
        fs::write(&output, b"y").unwrap();

        assert!(matches!(
            guard_output(&output, &[input.as_path()], false),
            Err(Error::OutputExists(_))
        ));
        assert!(guard_output(&output, &[input.as_path()], true).is_ok());
    }

    #[test]
    fn guard_detects_output_equal_to_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.pdf");
        fs::write(&input, b"x").unwrap();
        let aliased = dir.path().join(".").join("in.pdf");

        assert!(matches!(
            guard_output(&aliased, &[input.as_path()], false),
            Err(Error::OutputIsInput(_))
        ));
        assert!(guard_output(&aliased, &[input.as_path()], true).is_ok());
    }

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("a/B.PDF")));
        assert!(!has_pdf_extension(Path::new("notes.txt")));
        assert!(!has_pdf_extension(Path::new("README")));
    }
}
