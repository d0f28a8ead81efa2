//! In-memory PDF fixtures shared by the unit and integration tests.
#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::path::{Path, PathBuf};

/// Where an outline item in a fixture points.
#[derive(Clone, Copy)]
pub enum Target {
    /// `/Dest [page /Fit]`, 0-based page.
    Page(usize),
    /// `/A << /S /GoTo /D [page /Fit] >>`, 0-based page.
    GoTo(usize),
    /// `/Dest (name)` registered in the `/Names /Dests` tree.
    Named(&'static str, usize),
    /// `/Dest` pointing at an object that does not exist.
    Broken,
    /// A `/URI` action instead of a destination.
    Uri,
}

pub struct Mark {
    pub title: &'static str,
    pub target: Target,
    pub children: Vec<Mark>,
}

pub fn mark(title: &'static str, target: Target) -> Mark {
    Mark {
        title,
        target,
        children: Vec::new(),
    }
}

pub fn parent(title: &'static str, target: Target, children: Vec<Mark>) -> Mark {
    Mark {
        title,
        target,
        children,
    }
}

/// A document of `page_count` letter-size pages labelled "Page N".
///
/// The media box and resources live on the page tree root, so every page
/// inherits them.
pub fn sample_document(page_count: usize) -> Document {
    sample_document_with_box(page_count, [0, 0, 612, 792])
}

pub fn sample_document_with_box(page_count: usize, media_box: [i64; 4]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for number in 1..=page_count {
        let content = format!("BT /F1 24 Tf 72 720 Td (Page {number}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Fixture"),
        "Author" => Object::string_literal("Tests"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc
}

/// Attaches `marks` as the document outline.
pub fn add_outline(doc: &mut Document, marks: &[Mark]) {
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    let root_id = doc.new_object_id();
    let mut names = Vec::new();
    let (first, last, count) = add_siblings(doc, root_id, marks, &page_ids, &mut names);

    let mut root = dictionary! { "Type" => "Outlines", "Count" => count };
    if let (Some(first), Some(last)) = (first, last) {
        root.set("First", first);
        root.set("Last", last);
    }
    doc.objects.insert(root_id, Object::Dictionary(root));

    let catalog_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = doc.get_dictionary_mut(catalog_id).unwrap();
    catalog.set("Outlines", root_id);
    if !names.is_empty() {
        catalog.set(
            "Names",
            dictionary! { "Dests" => dictionary! { "Names" => names } },
        );
    }
}

fn add_siblings(
    doc: &mut Document,
    parent_id: ObjectId,
    marks: &[Mark],
    page_ids: &[ObjectId],
    names: &mut Vec<Object>,
) -> (Option<ObjectId>, Option<ObjectId>, i64) {
    let ids: Vec<ObjectId> = marks.iter().map(|_| doc.new_object_id()).collect();
    let mut total = 0;

    for (i, mark) in marks.iter().enumerate() {
        let mut item = Dictionary::new();
        item.set("Title", Object::string_literal(mark.title));
        item.set("Parent", parent_id);
        if i > 0 {
            item.set("Prev", ids[i - 1]);
        }
        if i + 1 < ids.len() {
            item.set("Next", ids[i + 1]);
        }

        match mark.target {
            Target::Page(page) => {
                item.set("Dest", fit(page_ids[page]));
            }
            Target::GoTo(page) => {
                item.set(
                    "A",
                    dictionary! {
                        "S" => "GoTo",
                        "D" => fit(page_ids[page]),
                    },
                );
            }
            Target::Named(name, page) => {
                item.set("Dest", Object::string_literal(name));
                names.push(Object::string_literal(name));
                names.push(fit(page_ids[page]));
            }
            Target::Broken => {
                item.set("Dest", fit((9_999, 0)));
            }
            Target::Uri => {
                item.set(
                    "A",
                    dictionary! {
                        "S" => "URI",
                        "URI" => Object::string_literal("https://example.com"),
                    },
                );
            }
        }

        let (first, last, count) = add_siblings(doc, ids[i], &mark.children, page_ids, names);
        if let (Some(first), Some(last)) = (first, last) {
            item.set("First", first);
            item.set("Last", last);
            item.set("Count", count);
        }
        total += 1 + count;
        doc.objects.insert(ids[i], Object::Dictionary(item));
    }

    (ids.first().copied(), ids.last().copied(), total)
}

fn fit(page_id: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())])
}

/// The "Page N" label drawn on a page by [`sample_document`].
pub fn page_label(doc: &Document, page_id: ObjectId) -> String {
    let page = doc.get_dictionary(page_id).unwrap();
    let content_id = page.get(b"Contents").unwrap().as_reference().unwrap();
    let stream = doc.get_object(content_id).unwrap().as_stream().unwrap();
    let text = String::from_utf8_lossy(&stream.content).into_owned();
    let start = text.find('(').unwrap() + 1;
    let end = text.find(')').unwrap();
    text[start..end].to_string()
}

/// Labels of every page in document order.
pub fn page_labels(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .values()
        .map(|&id| page_label(doc, id))
        .collect()
}

/// Saves `doc` as `name` inside `dir`.
pub fn write_pdf(dir: &Path, name: &str, mut doc: Document) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}
