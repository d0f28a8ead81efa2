//! Document outlines (bookmarks): reading them as a tree, resolving each
//! entry to a page, and replaying the tree onto another document.

use crate::document::deref;
use crate::error::{Error, Result};
use lopdf::{Bookmark, Dictionary, Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};
use std::ops::AddAssign;
use tracing::{debug, warn};

/// Name trees deeper than this are treated as broken.
const MAX_DEPTH: usize = 32;

/// Where an outline item points, as written in the source document.
///
/// Nothing is resolved at read time; see [`PageResolver`].
#[derive(Debug, Clone)]
pub enum Destination {
    /// An explicit destination (`[page /XYZ ...]`) or a dictionary holding one in `/D`.
    Explicit(Object),
    /// A named destination looked up through the catalog.
    Named(Vec<u8>),
    /// An action other than `/GoTo`.
    Action(String),
    Missing,
}

#[derive(Debug, Clone)]
pub struct OutlineEntry {
    pub title: String,
    pub destination: Destination,
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    /// This entry plus all of its descendants.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineEntry::count).sum::<usize>()
    }
}

/// Total number of entries in a forest.
pub fn count_entries(entries: &[OutlineEntry]) -> usize {
    entries.iter().map(OutlineEntry::count).sum()
}

/// Depth-first listing of a forest with each entry's nesting level.
pub fn flatten(entries: &[OutlineEntry]) -> Vec<(usize, &OutlineEntry)> {
    fn walk<'a>(entries: &'a [OutlineEntry], level: usize, out: &mut Vec<(usize, &'a OutlineEntry)>) {
        for entry in entries {
            out.push((level, entry));
            walk(&entry.children, level + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(entries, 0, &mut out);
    out
}

/// Reads the outline of `doc` as a forest of top-level entries.
///
/// A document without `/Outlines` yields an empty forest. Items that are
/// reached twice (a malformed `/Next` or `/First` cycle) end their sibling
/// chain with a warning.
pub fn read_outline(doc: &Document) -> Result<Vec<OutlineEntry>> {
    let catalog = doc.catalog()?;
    let Ok(outlines) = catalog.get(b"Outlines") else {
        return Ok(Vec::new());
    };
    let Ok(root) = deref(doc, outlines).as_dict() else {
        warn!("/Outlines is not a dictionary, ignoring it");
        return Ok(Vec::new());
    };

    let mut visited = HashSet::new();
    Ok(read_siblings(doc, root.get(b"First").ok(), &mut visited))
}

fn read_siblings(
    doc: &Document,
    first: Option<&Object>,
    visited: &mut HashSet<ObjectId>,
) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    let mut cursor = first.and_then(|obj| obj.as_reference().ok());

    while let Some(item_id) = cursor {
        if !visited.insert(item_id) {
            warn!(item = ?item_id, "outline item reached twice, cutting the cycle");
            break;
        }
        let Ok(item) = doc.get_dictionary(item_id) else {
            warn!(item = ?item_id, "outline item is not a dictionary");
            break;
        };

        let title = item
            .get(b"Title")
            .map(|t| decode_text(deref(doc, t)))
            .unwrap_or_default();
        let destination = destination_of(doc, item);
        let children = read_siblings(doc, item.get(b"First").ok(), visited);
        entries.push(OutlineEntry {
            title,
            destination,
            children,
        });

        cursor = item.get(b"Next").and_then(Object::as_reference).ok();
    }
    entries
}

fn destination_of(doc: &Document, item: &Dictionary) -> Destination {
    if let Ok(dest) = item.get(b"Dest") {
        return Destination::from_object(deref(doc, dest));
    }
    let Ok(action) = item.get(b"A").map(|a| deref(doc, a)) else {
        return Destination::Missing;
    };
    let Ok(action) = action.as_dict() else {
        return Destination::Action("malformed action".to_string());
    };
    match action.get(b"S") {
        Ok(Object::Name(kind)) if kind == b"GoTo" => match action.get(b"D") {
            Ok(dest) => Destination::from_object(deref(doc, dest)),
            Err(_) => Destination::Missing,
        },
        Ok(Object::Name(kind)) => Destination::Action(String::from_utf8_lossy(kind).into_owned()),
        _ => Destination::Action("untyped action".to_string()),
    }
}

impl Destination {
    fn from_object(obj: &Object) -> Self {
        match obj {
            Object::Name(name) | Object::String(name, _) => Destination::Named(name.clone()),
            other => Destination::Explicit(other.clone()),
        }
    }
}

/// Decodes a PDF text string: UTF-16BE or UTF-8 with a byte order mark,
/// otherwise single-byte (PDFDocEncoding is treated as Latin-1).
pub fn decode_text(obj: &Object) -> String {
    let bytes = match obj {
        Object::String(bytes, _) | Object::Name(bytes) => bytes.as_slice(),
        _ => return String::new(),
    };
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Resolves outline destinations of one document to 0-based page indices.
pub struct PageResolver<'a> {
    doc: &'a Document,
    page_index: HashMap<ObjectId, usize>,
}

impl<'a> PageResolver<'a> {
    pub fn new(doc: &'a Document) -> Self {
        let page_index = doc
            .get_pages()
            .values()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        Self { doc, page_index }
    }

    pub fn page_count(&self) -> usize {
        self.page_index.len()
    }

    /// The page `entry` jumps to, or [`Error::UnresolvableBookmark`].
    pub fn resolve(&self, entry: &OutlineEntry) -> Result<usize> {
        self.resolve_destination(&entry.destination)
            .map_err(|reason| Error::unresolvable(&entry.title, reason))
    }

    fn resolve_destination(&self, destination: &Destination) -> std::result::Result<usize, String> {
        match destination {
            Destination::Explicit(obj) => self.resolve_explicit(obj),
            Destination::Named(name) => {
                let target = self.lookup_name(name).ok_or_else(|| {
                    format!(
                        "named destination '{}' is not defined",
                        String::from_utf8_lossy(name)
                    )
                })?;
                self.resolve_explicit(target)
            }
            Destination::Action(kind) => Err(format!("/{kind} action is not a page destination")),
            Destination::Missing => Err("no destination".to_string()),
        }
    }

    fn resolve_explicit(&self, obj: &Object) -> std::result::Result<usize, String> {
        match deref(self.doc, obj) {
            Object::Array(items) => match items.first() {
                Some(Object::Reference(id)) => self
                    .page_index
                    .get(id)
                    .copied()
                    .ok_or_else(|| format!("object {} {} R is not a page", id.0, id.1)),
                Some(Object::Integer(n)) => usize::try_from(*n)
                    .ok()
                    .filter(|&n| n < self.page_count())
                    .ok_or_else(|| format!("page number {n} is out of range")),
                Some(_) => Err("unsupported destination target".to_string()),
                None => Err("empty destination array".to_string()),
            },
            Object::Dictionary(dict) => match dict.get(b"D") {
                Ok(inner) if !matches!(deref(self.doc, inner), Object::Dictionary(_)) => {
                    self.resolve_explicit(inner)
                }
                _ => Err("destination dictionary has no /D array".to_string()),
            },
            _ => Err("destination is not an array".to_string()),
        }
    }

    /// Named destinations live in the catalog's `/Dests` dictionary (PDF 1.1)
    /// or in the `/Names /Dests` name tree.
    fn lookup_name(&self, name: &[u8]) -> Option<&'a Object> {
        let doc = self.doc;
        let catalog = doc.catalog().ok()?;

        if let Ok(dests) = catalog.get(b"Dests").map(|d| deref(doc, d)) {
            if let Ok(found) = dests.as_dict().and_then(|d| d.get(name)) {
                return Some(found);
            }
        }

        let names = catalog.get(b"Names").map(|n| deref(doc, n)).ok()?;
        let tree = names.as_dict().and_then(|n| n.get(b"Dests")).ok()?;
        find_in_name_tree(doc, tree, name, 0)
    }
}

fn find_in_name_tree<'a>(
    doc: &'a Document,
    node: &'a Object,
    key: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_DEPTH {
        return None;
    }
    let node = deref(doc, node).as_dict().ok()?;

    if let Ok(Object::Array(names)) = node.get(b"Names").map(|n| deref(doc, n)) {
        for pair in names.chunks_exact(2) {
            if let Object::String(candidate, _) = deref(doc, &pair[0]) {
                if candidate.as_slice() == key {
                    return Some(&pair[1]);
                }
            }
        }
    }
    if let Ok(Object::Array(kids)) = node.get(b"Kids").map(|k| deref(doc, k)) {
        for kid in kids {
            if let Some(found) = find_in_name_tree(doc, kid, key, depth + 1) {
                return Some(found);
            }
        }
    }
    None
}

/// The writing half of an outline transfer.
///
/// Nodes are handed out by [`add_entry`](Self::add_entry) and passed back as
/// the parent of later entries.
pub trait OutlineSink {
    type Node: Copy;

    /// Number of pages entries may point at.
    fn page_count(&self) -> usize;

    /// Appends an entry as the last child of `parent`, or at top level.
    ///
    /// Fails with [`Error::UnresolvableBookmark`] when `page_index` has no
    /// page in the sink.
    fn add_entry(
        &mut self,
        title: &str,
        page_index: usize,
        parent: Option<Self::Node>,
    ) -> Result<Self::Node>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub copied: usize,
    /// Entries dropped, counting the descendants of each unresolvable entry.
    pub skipped: usize,
}

impl AddAssign for TransferStats {
    fn add_assign(&mut self, other: Self) {
        self.copied += other.copied;
        self.skipped += other.skipped;
    }
}

/// Reads `source`'s outline and replays it onto `sink`.
///
/// A document whose outline cannot be read contributes nothing.
pub fn copy_outline<S: OutlineSink>(source: &Document, sink: &mut S) -> TransferStats {
    match read_outline(source) {
        Ok(entries) => transfer_outline(&entries, &PageResolver::new(source), sink),
        Err(err) => {
            warn!("ignoring unreadable outline: {err}");
            TransferStats::default()
        }
    }
}

/// Replays `entries` onto `sink`, resolving each against `resolver`.
///
/// An entry that does not resolve to a page of the sink is logged and
/// dropped together with its whole subtree; its siblings are still copied.
pub fn transfer_outline<S: OutlineSink>(
    entries: &[OutlineEntry],
    resolver: &PageResolver<'_>,
    sink: &mut S,
) -> TransferStats {
    let mut stats = TransferStats::default();
    transfer_level(entries, resolver, sink, None, &mut stats);
    stats
}

fn transfer_level<S: OutlineSink>(
    entries: &[OutlineEntry],
    resolver: &PageResolver<'_>,
    sink: &mut S,
    parent: Option<S::Node>,
    stats: &mut TransferStats,
) {
    for entry in entries {
        let page_count = sink.page_count();
        let added = resolver
            .resolve(entry)
            .and_then(|page| {
                if page < page_count {
                    Ok(page)
                } else {
                    Err(Error::unresolvable(
                        &entry.title,
                        format!("page {} is beyond the last output page ({page_count})", page + 1),
                    ))
                }
            })
            .and_then(|page| {
                debug!(title = %entry.title, page, "copying bookmark");
                sink.add_entry(&entry.title, page, parent)
            });

        match added {
            Ok(node) => {
                stats.copied += 1;
                transfer_level(&entry.children, resolver, sink, Some(node), stats);
            }
            Err(err) => {
                let dropped = entry.count();
                warn!(dropped, "skipping {err}");
                stats.skipped += dropped;
            }
        }
    }
}

/// Writes outline entries into a document through lopdf's bookmark table.
///
/// Page indices are looked up in a page list: by default the document's own
/// pages, or any mapping given to [`with_pages`](Self::with_pages).
pub struct BookmarkWriter<'a> {
    doc: &'a mut Document,
    pages: Vec<Option<ObjectId>>,
}

impl<'a> BookmarkWriter<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        let pages = doc.get_pages().into_values().map(Some).collect();
        Self { doc, pages }
    }

    /// A writer whose page index `i` lands on `pages[i]`; `None` marks a page
    /// that is not in the document, and entries pointing there are refused.
    pub fn with_pages(doc: &'a mut Document, pages: Vec<Option<ObjectId>>) -> Self {
        Self { doc, pages }
    }

    /// Builds the outline objects and links them from the catalog.
    /// Returns `false` when no entry was added.
    pub fn finish(self) -> Result<bool> {
        link_outline(self.doc)
    }
}

/// Turns the bookmarks added to `doc` into an outline linked from its
/// catalog. Returns `false` when there were none.
pub fn link_outline(doc: &mut Document) -> Result<bool> {
    let Some(outline_id) = doc.build_outline() else {
        return Ok(false);
    };
    let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference)?;
    doc.get_dictionary_mut(catalog_id)?
        .set("Outlines", Object::Reference(outline_id));
    Ok(true)
}

impl OutlineSink for BookmarkWriter<'_> {
    type Node = u32;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn add_entry(&mut self, title: &str, page_index: usize, parent: Option<u32>) -> Result<u32> {
        let Some(page_id) = self.pages.get(page_index).copied().flatten() else {
            return Err(Error::unresolvable(
                title,
                format!("page {} is not part of the output", page_index + 1),
            ));
        };
        let bookmark = Bookmark::new(title.to_string(), [0.0, 0.0, 0.0], 0, page_id);
        Ok(self.doc.add_bookmark(bookmark, parent))
    }
}
