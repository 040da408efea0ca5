//! Output document construction
//!
//! Every operation builds a fresh document and copies pages into it, so a
//! parsed input is never edited in place. Objects from a source are imported
//! with their ids shifted past everything already in the output, the same
//! remapping a plain merge needs.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::PdfEditError;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bounds the parent walk on malformed (cyclic) page trees
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when no MediaBox is found anywhere up the tree
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Pages of a source document after its objects were imported into a copier
pub(crate) struct ImportedDocument {
    pages: Vec<ImportedPage>,
}

struct ImportedPage {
    id: ObjectId,
    inherited: Vec<(Vec<u8>, Object)>,
}

impl ImportedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Builds an output document page by page
pub(crate) struct PageCopier {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    placed: HashSet<ObjectId>,
}

impl PageCopier {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            placed: HashSet::new(),
        }
    }

    /// Import every object of `source`, shifting ids past the current output.
    pub fn import(&mut self, source: &Document) -> ImportedDocument {
        let offset = self.doc.max_id;
        let source_max = source
            .objects
            .keys()
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
            .max(source.max_id);

        for (id, object) in &source.objects {
            self.doc
                .objects
                .insert((id.0 + offset, id.1), remap_object_refs(object.clone(), offset));
        }
        self.doc.max_id = offset + source_max;

        let pages = source
            .get_pages()
            .into_values()
            .map(|page_id| ImportedPage {
                id: (page_id.0 + offset, page_id.1),
                inherited: inherited_attributes(source, page_id)
                    .into_iter()
                    .map(|(key, value)| (key, remap_object_refs(value, offset)))
                    .collect(),
            })
            .collect();

        ImportedDocument { pages }
    }

    /// Append page `index` (0-based) of an imported source.
    ///
    /// The first placement reuses the imported page object; placing the same
    /// page again appends a copy so each kid has its own dictionary.
    pub fn append_page(
        &mut self,
        source: &ImportedDocument,
        index: usize,
    ) -> Result<(), PdfEditError> {
        let page = source.pages.get(index).ok_or_else(|| {
            PdfEditError::InvalidRange(format!(
                "Page {} does not exist (document has {} pages)",
                index + 1,
                source.page_count()
            ))
        })?;

        let id = if self.placed.insert(page.id) {
            let pages_id = self.pages_id;
            let dict = self
                .doc
                .get_object_mut(page.id)
                .and_then(Object::as_dict_mut)?;
            dict.set("Parent", Object::Reference(pages_id));
            for (key, value) in &page.inherited {
                if !dict.has(key) {
                    dict.set(key.clone(), value.clone());
                }
            }
            page.id
        } else {
            let copy = self.doc.get_dictionary(page.id)?.clone();
            self.doc.add_object(copy)
        };

        self.kids.push(id);
        Ok(())
    }

    pub fn append_all(&mut self, source: &ImportedDocument) -> Result<(), PdfEditError> {
        for index in 0..source.page_count() {
            self.append_page(source, index)?;
        }
        Ok(())
    }

    /// Write the page tree and catalog, then drop everything unreachable.
    pub fn finish(mut self) -> Document {
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(self.kids.len() as i64)),
            (
                "Kids",
                Object::Array(self.kids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]);
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc.compress();
        self.doc
    }
}

/// Copy every page of `source` into a new document.
pub(crate) fn copy_document(source: &Document) -> Result<Document, PdfEditError> {
    let mut copier = PageCopier::new();
    let imported = copier.import(source);
    copier.append_all(&imported)?;
    Ok(copier.finish())
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Attributes the page lacks itself but inherits through its Parent chain
fn inherited_attributes(source: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let mut found = Vec::new();
    let Ok(page) = source.get_dictionary(page_id) else {
        return found;
    };

    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;
        while let Some(parent_id) = parent {
            if depth >= MAX_TREE_DEPTH {
                break;
            }
            depth += 1;
            let Ok(node) = source.get_dictionary(parent_id) else {
                break;
            };
            if let Ok(value) = node.get(key) {
                found.push((key.to_vec(), value.clone()));
                break;
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }

    let has_media_box = page.has(b"MediaBox")
        || found
            .iter()
            .any(|(key, _)| key.as_slice() == b"MediaBox".as_slice());
    if !has_media_box {
        found.push((
            b"MediaBox".to_vec(),
            Object::Array(DEFAULT_MEDIA_BOX.iter().map(|v| Object::Integer(*v)).collect()),
        ));
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_pdf, page_texts};
    use pretty_assertions::assert_eq;

    fn save(mut doc: Document) -> Vec<u8> {
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_remap_shifts_nested_references() {
        let obj = Object::Array(vec![
            Object::Reference((3, 0)),
            Object::Dictionary(Dictionary::from_iter(vec![("P", Object::Reference((5, 0)))])),
        ]);
        let remapped = remap_object_refs(obj, 10);
        let arr = remapped.as_array().unwrap();
        assert_eq!(arr[0].as_reference().unwrap(), (13, 0));
        let nested = arr[1].as_dict().unwrap().get(b"P").unwrap();
        assert_eq!(nested.as_reference().unwrap(), (15, 0));
    }

    #[test]
    fn test_copy_two_sources_keeps_order() {
        let a = Document::load_mem(&create_test_pdf(2, "A")).unwrap();
        let b = Document::load_mem(&create_test_pdf(1, "B")).unwrap();

        let mut copier = PageCopier::new();
        let first = copier.import(&a);
        let second = copier.import(&b);
        copier.append_all(&second).unwrap();
        copier.append_all(&first).unwrap();

        let bytes = save(copier.finish());
        assert_eq!(page_texts(&bytes), vec!["B-Page-1", "A-Page-1", "A-Page-2"]);
    }

    #[test]
    fn test_duplicate_pages_get_distinct_objects() {
        let source = Document::load_mem(&create_test_pdf(1, "Dup")).unwrap();

        let mut copier = PageCopier::new();
        let imported = copier.import(&source);
        copier.append_page(&imported, 0).unwrap();
        copier.append_page(&imported, 0).unwrap();
        let doc = copier.finish();

        let ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_inherited_media_box_is_materialized() {
        let mut source = Document::load_mem(&create_test_pdf(1, "Inh")).unwrap();
        let page_id = *source.get_pages().get(&1).unwrap();
        let page = source.get_dictionary_mut(page_id).unwrap();
        page.remove(b"MediaBox");
        let pages_id = page.get(b"Parent").unwrap().as_reference().unwrap();
        let small_box = vec![0, 0, 300, 400].into_iter().map(Object::Integer).collect();
        source
            .get_dictionary_mut(pages_id)
            .unwrap()
            .set("MediaBox", Object::Array(small_box));

        let doc = copy_document(&source).unwrap();
        let new_page = *doc.get_pages().get(&1).unwrap();
        let corners: Vec<i64> = doc
            .get_dictionary(new_page)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(corners, vec![0, 0, 300, 400]);
    }

    #[test]
    fn test_append_out_of_range_fails() {
        let source = Document::load_mem(&create_test_pdf(2, "X")).unwrap();
        let mut copier = PageCopier::new();
        let imported = copier.import(&source);
        let err = copier.append_page(&imported, 5).unwrap_err();
        assert!(err.to_string().contains("2 pages"));
    }

    #[test]
    fn test_empty_output_is_loadable() {
        let doc = PageCopier::new().finish();
        let bytes = save(doc);
        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 0);
    }
}
