//! Loading and saving documents with path-aware errors.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::error::PagesError;

/// Page attributes a page may inherit from its ancestors.
pub(crate) const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Parse the document at `path`, rejecting documents without pages.
pub(crate) fn load(path: &Path) -> Result<Document, PagesError> {
    let doc = Document::load(path).map_err(|e| PagesError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if doc.get_pages().is_empty() {
        return Err(PagesError::NoPages {
            path: path.to_path_buf(),
        });
    }
    Ok(doc)
}

/// Serialize `doc` and write it to `path`, replacing any existing file.
pub(crate) fn save(doc: &mut Document, path: &Path) -> Result<(), PagesError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| PagesError::Save {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, buffer).map_err(|source| PagesError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Object id of the root `Pages` node.
pub(crate) fn pages_root(doc: &Document) -> Result<ObjectId, PagesError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(|root| root.as_reference())
        .map_err(|_| PagesError::Structure("trailer has no Root reference".into()))?;

    doc.get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|pages| pages.as_reference())
        .map_err(|_| PagesError::Structure("catalog has no Pages reference".into()))
}

/// Inheritable attributes the page lacks itself, resolved from the nearest
/// ancestor that defines them.
pub(crate) fn inherited_attributes(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<(Vec<u8>, Object)>, PagesError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|_| PagesError::Structure(format!("page {page_id:?} is not a dictionary")))?;
    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();

    let mut inherited = Vec::new();
    let mut depth = 0;
    while let Some(node_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
        depth += 1;
    }
    Ok(inherited)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::{Path, PathBuf};

    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Document, Object, Stream, StringFormat};

    fn media_box() -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ])
    }

    /// Build a document with `num_pages` pages whose content shows
    /// `<label>-Page-<n>`. With `inherit_media_box` the media box sits on the
    /// `Pages` node instead of each page.
    pub fn build_pdf(num_pages: u32, label: &str, inherit_media_box: bool) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("{label}-Page-{}", i + 1).into_bytes(),
                            StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().expect("encode content"),
            ));

            let mut page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]);
            if !inherit_media_box {
                page.set("MediaBox", media_box());
            }
            page_ids.push(doc.add_object(page));
        }

        let mut pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        if inherit_media_box {
            pages.set("MediaBox", media_box());
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    /// Write a generated document to `dir/name`.
    pub fn write_pdf(dir: &Path, name: &str, num_pages: u32, label: &str) -> PathBuf {
        let path = dir.join(name);
        build_pdf(num_pages, label, false)
            .save(&path)
            .expect("save fixture");
        path
    }

    /// Text of every page, in page order.
    pub fn page_texts(path: &Path) -> Vec<String> {
        let doc = Document::load(path).expect("load");
        doc.get_pages()
            .values()
            .map(|id| {
                let bytes = doc.get_page_content(*id).expect("content");
                String::from_utf8_lossy(&bytes).into_owned()
            })
            .collect()
    }
}
