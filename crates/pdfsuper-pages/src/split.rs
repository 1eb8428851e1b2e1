//! Split a document into single-page documents.
//!
//! Each output holds only the objects reachable from its page, so the work
//! per page tracks the page's own size rather than the whole document.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::document;
use crate::error::PagesError;

/// Write every page of `input` to `out_dir` as `<stem><infix><n>.pdf`
/// (1-based) and return the written paths in page order.
///
/// Existing files with the same names are replaced.
pub fn split_to_pages(
    input: &Path,
    out_dir: &Path,
    infix: &str,
) -> Result<Vec<PathBuf>, PagesError> {
    let doc = document::load(input)?;
    let pages = doc.get_pages();

    std::fs::create_dir_all(out_dir).map_err(|source| PagesError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let mut written = Vec::with_capacity(pages.len());
    for (&number, &page_id) in &pages {
        let mut single = extract_page(&doc, page_id)?;
        single.compress();

        let path = out_dir.join(format!("{stem}{infix}{number}.pdf"));
        document::save(&mut single, &path)?;
        debug!(page = number, path = %path.display(), "Wrote page");
        written.push(path);
    }

    info!(
        input = %input.display(),
        pages = written.len(),
        out_dir = %out_dir.display(),
        "Split document"
    );
    Ok(written)
}

/// Build a one-page document holding `page_id` and everything it references.
fn extract_page(doc: &Document, page_id: ObjectId) -> Result<Document, PagesError> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|_| PagesError::Structure(format!("page {page_id:?} is not a dictionary")))?
        .clone();
    for (key, value) in document::inherited_attributes(doc, page_id)? {
        page.set(key, value);
    }
    page.remove(b"Parent");

    let mut single = Document::with_version(doc.version.clone());
    let mut pending: Vec<ObjectId> = Vec::new();
    collect_refs(&Object::Dictionary(page.clone()), &mut pending);

    let mut copied = BTreeSet::from([page_id]);
    while let Some(id) = pending.pop() {
        if !copied.insert(id) {
            continue;
        }
        let Ok(object) = doc.get_object(id) else {
            continue;
        };
        // Other pages and the page tree stay behind; references to them dangle as null.
        if is_page_tree_node(object) {
            continue;
        }
        collect_refs(object, &mut pending);
        single.objects.insert(id, object.clone());
    }

    single.max_id = doc.max_id;
    let pages_id = single.new_object_id();
    page.set("Parent", Object::Reference(pages_id));
    single.objects.insert(page_id, Object::Dictionary(page));
    single.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let catalog_id = single.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    single.trailer.set("Root", Object::Reference(catalog_id));
    Ok(single)
}

fn collect_refs(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|o| collect_refs(o, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_refs(v, out)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, v)| collect_refs(v, out)),
        _ => {}
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type").and_then(|t| t.as_name()),
        Ok(b"Page") | Ok(b"Pages")
    )
}
