//! Concatenate documents into one.
//!
//! Objects of every document after the first are imported with their ids
//! shifted past the destination's highest id. All pages are then attached
//! directly to the first document's root `Pages` node, so attributes they
//! used to inherit from their own page tree are copied onto the page first
//! and the root node keeps none of its own.

use std::path::{Path, PathBuf};

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info};

use crate::document::{self, INHERITABLE};
use crate::error::PagesError;

/// Merge `inputs`, in order, into `output`. Returns the merged page count.
pub fn merge(inputs: &[PathBuf], output: &Path) -> Result<usize, PagesError> {
    if inputs.len() < 2 {
        return Err(PagesError::NotEnoughInputs {
            count: inputs.len(),
        });
    }

    let mut loaded = inputs
        .iter()
        .map(|path| document::load(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut dest = loaded.remove(0);
    let root_id = document::pages_root(&dest)?;
    let mut kids: Vec<ObjectId> = dest.get_pages().values().copied().collect();
    let mut max_id = dest.max_id;

    for (source, path) in loaded.into_iter().zip(&inputs[1..]) {
        let offset = max_id;
        let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();
        debug!(input = %path.display(), pages = source_pages.len(), offset, "Importing document");

        for (id, object) in source.objects {
            dest.objects
                .insert((id.0 + offset, id.1), remap_object_refs(object, offset));
        }
        kids.extend(source_pages.into_iter().map(|id| (id.0 + offset, id.1)));
        max_id = max_id.max(source.max_id + offset);
    }
    dest.max_id = max_id;

    for &page_id in &kids {
        adopt_page(&mut dest, page_id, root_id)?;
    }
    update_page_tree(&mut dest, root_id, &kids)?;

    dest.prune_objects();
    dest.compress();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PagesError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    document::save(&mut dest, output)?;

    info!(
        inputs = inputs.len(),
        pages = kids.len(),
        output = %output.display(),
        "Merged documents"
    );
    Ok(kids.len())
}

/// Shift every indirect reference inside `obj` by `offset`.
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                let taken = std::mem::replace(value, Object::Null);
                *value = remap_object_refs(taken, offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                let taken = std::mem::replace(value, Object::Null);
                *value = remap_object_refs(taken, offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Copy inherited attributes onto the page and re-parent it under `root_id`.
fn adopt_page(doc: &mut Document, page_id: ObjectId, root_id: ObjectId) -> Result<(), PagesError> {
    let inherited = document::inherited_attributes(doc, page_id)?;

    let page = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| PagesError::Structure(format!("page {page_id:?} is not a dictionary")))?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    page.set("Parent", Object::Reference(root_id));
    Ok(())
}

fn update_page_tree(
    doc: &mut Document,
    root_id: ObjectId,
    kids: &[ObjectId],
) -> Result<(), PagesError> {
    let root = doc
        .get_object_mut(root_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| PagesError::Structure("root Pages node is not a dictionary".into()))?;

    root.set(
        "Kids",
        Object::Array(kids.iter().map(|&id| Object::Reference(id)).collect()),
    );
    root.set("Count", Object::Integer(kids.len() as i64));
    // Every page carries its own copy now; imported pages must not pick these up.
    for key in INHERITABLE {
        root.remove(key);
    }
    Ok(())
}
