//! Building a new document out of pages taken from one or more sources.
//!
//! Each imported page is copied together with every object it reaches
//! (fonts, images, content streams), renumbered into the target. The page
//! tree of the source is left behind: inheritable attributes are pulled down
//! onto the page first, and `finish` builds a fresh tree.

use crate::document::inherited_attribute;
use crate::error::{Error, Result};
use crate::outline::BookmarkWriter;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

const MAX_CHILDREN: usize = 8;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

pub struct PageAssembler {
    doc: Document,
    page_order: Vec<ObjectId>,
    has_info: bool,
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAssembler {
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
            page_order: Vec::new(),
            has_info: false,
        }
    }

    /// Number of pages placed so far.
    pub fn page_count(&self) -> usize {
        self.page_order.len()
    }

    /// Copies the given 1-based pages of `source` and places them at the end.
    pub fn append_pages(&mut self, source: &Document, pages: &[usize]) -> Result<Vec<ObjectId>> {
        let ids = self.import_pages(source, pages)?;
        self.page_order.extend(&ids);
        Ok(ids)
    }

    /// Copies every page of `source` and places them at the end.
    pub fn append_all(&mut self, source: &Document) -> Result<Vec<ObjectId>> {
        let pages: Vec<usize> = (1..=source.get_pages().len()).collect();
        self.append_pages(source, &pages)
    }

    /// Copies the given 1-based pages of `source` without placing them.
    ///
    /// Objects shared between these pages are copied once. Use
    /// [`push_pages`](Self::push_pages) to decide where they go.
    pub fn import_pages(&mut self, source: &Document, pages: &[usize]) -> Result<Vec<ObjectId>> {
        let page_map = source.get_pages();
        let mut page_ids = Vec::with_capacity(pages.len());
        for &page_num in pages {
            let page_id = u32::try_from(page_num)
                .ok()
                .and_then(|n| page_map.get(&n).copied())
                .ok_or_else(|| {
                    Error::page_range(
                        &page_num.to_string(),
                        format!("page {page_num} not found in document"),
                    )
                })?;
            page_ids.push(page_id);
        }

        // Pages are numbered up front so links between imported pages survive.
        let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
        for &page_id in &page_ids {
            if !id_map.contains_key(&page_id) {
                id_map.insert(page_id, self.doc.new_object_id());
            }
        }
        let mut copied: HashSet<ObjectId> = HashSet::new();
        let mut imported = Vec::with_capacity(page_ids.len());

        for (&page_num, &page_id) in pages.iter().zip(&page_ids) {
            let inherited: Vec<(&[u8], Object)> = INHERITABLE
                .iter()
                .filter_map(|&key| {
                    inherited_attribute(source, page_id, key)
                        .filter(|(owner, _)| *owner != page_id)
                        .map(|(_, value)| (key, value.clone()))
                })
                .collect();

            let mut referenced = BTreeSet::new();
            collect_referenced_objects(source, page_id, page_id, &mut referenced)?;
            for (_, value) in &inherited {
                collect_from_object(source, page_id, value, &mut referenced)?;
            }

            let fresh: Vec<ObjectId> = referenced
                .into_iter()
                .filter(|id| !copied.contains(id))
                .collect();
            for &old_id in &fresh {
                id_map
                    .entry(old_id)
                    .or_insert_with(|| self.doc.new_object_id());
            }
            for &old_id in &fresh {
                let mut cloned = source.get_object(old_id)?.clone();
                update_references_in_object(&mut cloned, &id_map);
                self.doc.objects.insert(id_map[&old_id], cloned);
                copied.insert(old_id);
            }

            let new_page_id = id_map[&page_id];
            if let Ok(page) = self.doc.get_dictionary_mut(new_page_id) {
                page.remove(b"Parent");
                for (key, mut value) in inherited {
                    update_references_in_object(&mut value, &id_map);
                    page.set(key.to_vec(), value);
                }
            }
            trace!(page = page_num, from = ?page_id, to = ?new_page_id, "imported page");
            imported.push(new_page_id);
        }

        if !self.has_info {
            self.adopt_info(source);
        }
        debug!(pages = imported.len(), objects = copied.len(), "imported pages");
        Ok(imported)
    }

    /// Places previously imported pages at the end of the page order.
    pub fn push_pages(&mut self, ids: &[ObjectId]) {
        self.page_order.extend_from_slice(ids);
    }

    /// A bookmark writer over the document being assembled.
    ///
    /// `pages[i]` is the imported page that page index `i` of some source
    /// became, or `None` when that page was left out. The outline is linked
    /// into the catalog by [`crate::outline::link_outline`] once [`finish`](Self::finish)
    /// has built it.
    pub fn bookmarks(&mut self, pages: Vec<Option<ObjectId>>) -> BookmarkWriter<'_> {
        BookmarkWriter::with_pages(&mut self.doc, pages)
    }

    /// Builds the page tree, catalog and trailer.
    pub fn finish(mut self) -> Document {
        let pages_id = create_page_tree(&mut self.doc, &self.page_order);

        let mut catalog = Dictionary::new();
        catalog.set(b"Type".to_vec(), Object::Name(b"Catalog".to_vec()));
        catalog.set(b"Pages".to_vec(), Object::Reference(pages_id));
        let catalog_id = self.doc.add_object(catalog);

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc
            .trailer
            .set("Size", Object::Integer(self.doc.max_id as i64 + 1));
        self.doc
    }

    /// Carries over the first source's document information dictionary.
    fn adopt_info(&mut self, source: &Document) {
        let Ok(Object::Reference(info_id)) = source.trailer.get(b"Info") else {
            return;
        };
        let Ok(info) = source.get_dictionary(*info_id) else {
            return;
        };

        let mut copied = Dictionary::new();
        for (key, value) in info.iter() {
            // Indirect metadata values would drag unrelated objects along.
            if !matches!(value, Object::Reference(_)) {
                copied.set(key.clone(), value.clone());
            }
        }
        let info_id = self.doc.add_object(copied);
        self.doc.trailer.set("Info", Object::Reference(info_id));
        self.has_info = true;
    }
}

fn update_references_in_object(obj: &mut Object, id_map: &HashMap<ObjectId, ObjectId>) {
    match obj {
        // Anything not copied along (other pages, missing objects) is cut.
        Object::Reference(id) => {
            *obj = match id_map.get(id) {
                Some(&new_id) => Object::Reference(new_id),
                None => Object::Null,
            };
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                update_references_in_object(item, id_map);
            }
        }
        Object::Dictionary(dict) => update_references_in_dictionary(dict, id_map),
        Object::Stream(stream) => update_references_in_dictionary(&mut stream.dict, id_map),
        _ => {}
    }
}

fn update_references_in_dictionary(dict: &mut Dictionary, id_map: &HashMap<ObjectId, ObjectId>) {
    let keys: Vec<Vec<u8>> = dict.iter().map(|(k, _)| k.clone()).collect();
    for key in keys {
        if let Ok(val) = dict.get_mut(&key) {
            update_references_in_object(val, id_map);
        }
    }
}

/// Gathers every object reachable from `obj_id` for copying along with the
/// page `root`. Other pages are leaves: a link to one must not drag it in.
fn collect_referenced_objects(
    doc: &Document,
    root: ObjectId,
    obj_id: ObjectId,
    visited: &mut BTreeSet<ObjectId>,
) -> Result<()> {
    let obj = doc.get_object(obj_id)?;
    if obj_id != root && is_page(obj) {
        return Ok(());
    }
    if !visited.insert(obj_id) {
        return Ok(());
    }
    collect_from_object(doc, root, obj, visited)
}

fn collect_from_object(
    doc: &Document,
    root: ObjectId,
    obj: &Object,
    visited: &mut BTreeSet<ObjectId>,
) -> Result<()> {
    match obj {
        Object::Reference(id) => {
            if doc.objects.contains_key(id) {
                collect_referenced_objects(doc, root, *id, visited)?;
            }
        }
        Object::Array(items) => {
            for item in items {
                collect_from_object(doc, root, item, visited)?;
            }
        }
        Object::Dictionary(dict) => collect_from_dictionary(doc, root, dict, visited)?,
        Object::Stream(stream) => collect_from_dictionary(doc, root, &stream.dict, visited)?,
        _ => {}
    }
    Ok(())
}

fn is_page(obj: &Object) -> bool {
    matches!(
        obj.as_dict().and_then(|dict| dict.get(b"Type")),
        Ok(Object::Name(name)) if name == b"Page"
    )
}

fn collect_from_dictionary(
    doc: &Document,
    root: ObjectId,
    dict: &Dictionary,
    visited: &mut BTreeSet<ObjectId>,
) -> Result<()> {
    let is_page_node = matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name == b"Page" || name == b"Pages"
    );
    for (key, val) in dict.iter() {
        // Following /Parent out of a page would pull in the whole source tree.
        if is_page_node && key == b"Parent" {
            continue;
        }
        collect_from_object(doc, root, val, visited)?;
    }
    Ok(())
}

/// Creates a balanced page tree over `page_ids` and returns its root.
fn create_page_tree(doc: &mut Document, page_ids: &[ObjectId]) -> ObjectId {
    let root_id = doc.new_object_id();
    attach_kids(doc, root_id, None, page_ids);
    root_id
}

fn attach_kids(doc: &mut Document, node_id: ObjectId, parent: Option<ObjectId>, pages: &[ObjectId]) {
    let mut kids = Vec::new();
    if pages.len() <= MAX_CHILDREN {
        for &page_id in pages {
            if let Ok(page) = doc.get_dictionary_mut(page_id) {
                page.set(b"Parent".to_vec(), Object::Reference(node_id));
            }
            kids.push(Object::Reference(page_id));
        }
    } else {
        let chunk_size = pages.len().div_ceil(MAX_CHILDREN);
        for chunk in pages.chunks(chunk_size) {
            let child_id = doc.new_object_id();
            attach_kids(doc, child_id, Some(node_id), chunk);
            kids.push(Object::Reference(child_id));
        }
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set(b"Type".to_vec(), Object::Name(b"Pages".to_vec()));
    pages_dict.set(b"Kids".to_vec(), Object::Array(kids));
    pages_dict.set(b"Count".to_vec(), Object::Integer(pages.len() as i64));
    if let Some(parent) = parent {
        pages_dict.set(b"Parent".to_vec(), Object::Reference(parent));
    }
    doc.objects.insert(node_id, Object::Dictionary(pages_dict));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{page_label, sample_document};
    use lopdf::dictionary;

    /// Puts a link annotation on page 1 that jumps to page `target`.
    fn link_first_page_to(doc: &mut Document, target: u32) {
        let pages = doc.get_pages();
        let annot = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => Object::Array((0..4).map(|_| Object::Integer(10)).collect()),
            "Dest" => Object::Array(vec![
                Object::Reference(pages[&target]),
                Object::Name(b"Fit".to_vec()),
            ]),
        });
        doc.get_dictionary_mut(pages[&1])
            .unwrap()
            .set("Annots", Object::Array(vec![Object::Reference(annot)]));
    }

    fn link_target(doc: &Document, page_id: ObjectId) -> Object {
        let page = doc.get_dictionary(page_id).unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        let annot = doc
            .get_dictionary(annots[0].as_reference().unwrap())
            .unwrap();
        annot.get(b"Dest").unwrap().as_array().unwrap()[0].clone()
    }

    fn count_page_objects(doc: &Document) -> usize {
        doc.objects.values().filter(|obj| is_page(obj)).count()
    }

    #[test]
    fn appended_pages_keep_requested_order() {
        let source = sample_document(5);
        let mut assembler = PageAssembler::new();
        assembler.append_pages(&source, &[4, 2]).unwrap();
        let doc = assembler.finish();

        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(page_label(&doc, pages[&1]), "Page 4");
        assert_eq!(page_label(&doc, pages[&2]), "Page 2");
    }

    #[test]
    fn inherited_media_box_is_materialized() {
        let source = sample_document(1);
        let mut assembler = PageAssembler::new();
        let ids = assembler.append_all(&source).unwrap();
        let doc = assembler.finish();

        let page = doc.get_dictionary(ids[0]).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }

    #[test]
    fn source_page_tree_is_not_copied() {
        let source = sample_document(3);
        let mut assembler = PageAssembler::new();
        assembler.append_pages(&source, &[2]).unwrap();
        let doc = assembler.finish();

        assert_eq!(count_page_objects(&doc), 1);
    }

    #[test]
    fn link_to_a_page_left_behind_is_cut() {
        let mut source = sample_document(3);
        link_first_page_to(&mut source, 3);
        let mut assembler = PageAssembler::new();
        let ids = assembler.append_pages(&source, &[1]).unwrap();
        let doc = assembler.finish();

        assert_eq!(count_page_objects(&doc), 1);
        assert_eq!(doc.get_pages().len(), 1);
        assert!(matches!(link_target(&doc, ids[0]), Object::Null));
    }

    #[test]
    fn link_between_imported_pages_is_renumbered() {
        let mut source = sample_document(3);
        link_first_page_to(&mut source, 3);
        let mut assembler = PageAssembler::new();
        let ids = assembler.append_pages(&source, &[1, 3]).unwrap();
        let doc = assembler.finish();

        assert_eq!(count_page_objects(&doc), 2);
        assert!(matches!(link_target(&doc, ids[0]), Object::Reference(id) if id == ids[1]));
        assert_eq!(page_label(&doc, ids[1]), "Page 3");
    }

    #[test]
    fn dangling_references_become_null() {
        let mut source = sample_document(1);
        let page_id = source.get_pages()[&1];
        source
            .get_dictionary_mut(page_id)
            .unwrap()
            .set("Thumb", Object::Reference((999, 0)));
        let mut assembler = PageAssembler::new();
        let ids = assembler.append_all(&source).unwrap();
        let doc = assembler.finish();

        let page = doc.get_dictionary(ids[0]).unwrap();
        assert!(matches!(page.get(b"Thumb"), Ok(Object::Null)));
    }

    #[test]
    fn large_selections_get_a_nested_tree() {
        let source = sample_document(30);
        let mut assembler = PageAssembler::new();
        assembler.append_all(&source).unwrap();
        let doc = assembler.finish();

        let pages = doc.get_pages();
        assert_eq!(pages.len(), 30);
        for (number, id) in pages {
            assert_eq!(page_label(&doc, id), format!("Page {number}"));
        }
    }

    #[test]
    fn empty_assembly_is_a_valid_document() {
        let doc = PageAssembler::new().finish();
        assert!(doc.get_pages().is_empty());
        assert!(doc.catalog().is_ok());
    }

    #[test]
    fn missing_page_is_an_error() {
        let source = sample_document(2);
        let mut assembler = PageAssembler::new();
        assert!(assembler.append_pages(&source, &[3]).is_err());
    }

    #[test]
    fn info_dictionary_is_carried_over() {
        let source = sample_document(1);
        let mut assembler = PageAssembler::new();
        assembler.append_all(&source).unwrap();
        let doc = assembler.finish();

        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert!(info.has(b"Title"));
    }
}
