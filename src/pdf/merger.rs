/*!
 * Merges the per-page PDF documents into one file with lopdf.
 *
 * Objects of every input are renumbered into one id space, then all pages
 * are re-parented under a single page tree in input order. Page content
 * streams are copied untouched.
 */

use std::collections::BTreeMap;

use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::errors::MergeError;

// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge two PDF byte streams; pages of `first` precede pages of `second`
pub fn merge(first: &[u8], second: &[u8]) -> Result<Vec<u8>, MergeError> {
    merge_all(&[first, second])
}

/// Merge any number of PDF byte streams in order
pub fn merge_all(inputs: &[&[u8]]) -> Result<Vec<u8>, MergeError> {
    let mut documents = Vec::with_capacity(inputs.len());
    for (position, bytes) in inputs.iter().enumerate() {
        documents.push(load(bytes, &input_label(position))?);
    }

    let mut merged = merge_documents(documents)?;

    let mut output = Vec::new();
    merged
        .save_to(&mut output)
        .map_err(|e| MergeError::Write(e.to_string()))?;
    debug!("Merged {} documents into {} bytes", inputs.len(), output.len());
    Ok(output)
}

/// Number of pages in a PDF byte stream
pub fn page_count(bytes: &[u8]) -> Result<usize, MergeError> {
    let doc = Document::load_mem(bytes).map_err(|e| MergeError::Format {
        input: "document".to_string(),
        message: e.to_string(),
    })?;
    Ok(doc.get_pages().len())
}

fn input_label(position: usize) -> String {
    format!("input {}", position + 1)
}

fn load(bytes: &[u8], label: &str) -> Result<Document, MergeError> {
    let format_error = |message: String| MergeError::Format {
        input: label.to_string(),
        message,
    };

    if !bytes.starts_with(b"%PDF-") {
        return Err(format_error("missing %PDF- header".to_string()));
    }
    let doc = Document::load_mem(bytes).map_err(|e| format_error(e.to_string()))?;
    if doc.get_pages().is_empty() {
        return Err(format_error("document has no pages".to_string()));
    }
    Ok(doc)
}

fn merge_documents(documents: Vec<Document>) -> Result<Document, MergeError> {
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (position, mut doc) in documents.into_iter().enumerate() {
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        // get_pages is keyed by page number, so this keeps document order
        for page_id in doc.get_pages().into_values() {
            let page = flatten_page(&doc, page_id).map_err(|message| MergeError::Format {
                input: input_label(position),
                message,
            })?;
            pages.push((page_id, page));
        }
        objects.extend(doc.objects);
    }

    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut page_tree_id: Option<ObjectId> = None;
    let mut merged = Document::with_version("1.5");

    for (object_id, object) in objects {
        match type_name(&object) {
            Some(b"Catalog") => {
                if catalog.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        catalog = Some((object_id, dict.clone()));
                    }
                }
            }
            Some(b"Pages") => {
                if page_tree_id.is_none() {
                    page_tree_id = Some(object_id);
                }
            }
            // Re-inserted below with their new parent
            Some(b"Page") => {}
            Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (catalog_id, mut catalog) = catalog.ok_or_else(|| MergeError::Format {
        input: "merged".to_string(),
        message: "no document catalog found".to_string(),
    })?;
    let page_tree_id = page_tree_id.ok_or_else(|| MergeError::Format {
        input: "merged".to_string(),
        message: "no page tree found".to_string(),
    })?;

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let mut page_tree = Dictionary::new();
    page_tree.set("Type", Object::Name(b"Pages".to_vec()));
    page_tree.set("Count", Object::Integer(pages.len() as i64));
    page_tree.set("Kids", Object::Array(kids));
    merged.objects.insert(page_tree_id, Object::Dictionary(page_tree));

    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(page_tree_id));
        merged.objects.insert(page_id, Object::Dictionary(page));
    }

    catalog.set("Pages", Object::Reference(page_tree_id));
    catalog.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    merged.renumber_objects();
    Ok(merged)
}

// Copy a page dictionary with inherited attributes written onto it, since
// the page is about to lose its original ancestors.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, String> {
    let mut page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("page {:?}: {}", page_id, e))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        depth += 1;
        if depth > 64 {
            return Err(format!("page tree above {:?} is too deep or cyclic", page_id));
        }
        let Ok(node) = doc.get_object(parent_id).and_then(Object::as_dict) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

fn type_name(object: &Object) -> Option<&[u8]> {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|name| name.as_name().ok())
}
