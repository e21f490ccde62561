//! PDF structure operations on top of lopdf: compress, merge and split.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use lopdf::{Document, Object, ObjectId};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::RenderError;
use crate::model::PageRange;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

fn pdf_err(e: lopdf::Error) -> RenderError {
    RenderError::Corrupt(e.to_string())
}

pub fn load(bytes: &[u8], name: &str) -> Result<Document, RenderError> {
    let doc = Document::load_mem(bytes).map_err(|e| RenderError::UnsupportedInput {
        name: name.to_string(),
        reason: format!("not a readable PDF: {}", e),
    })?;
    if doc.get_pages().is_empty() {
        return Err(RenderError::UnsupportedInput {
            name: name.to_string(),
            reason: "PDF has no pages".to_string(),
        });
    }
    Ok(doc)
}

pub fn save(doc: &mut Document) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| pdf_err(e.into()))?;
    Ok(buffer)
}

pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Drops unreachable objects and empty streams, then deflates all streams.
pub fn compress(mut doc: Document) -> Result<Vec<u8>, RenderError> {
    let pruned = doc.prune_objects().len();
    let empty = doc.delete_zero_length_streams().len();
    doc.compress();
    log::debug!("Compressed PDF: pruned {} objects, {} empty streams", pruned, empty);
    save(&mut doc)
}

/// Copies objects between documents, remapping references.
///
/// An id is reserved before recursing so cyclic references (page → parent →
/// kids → page) terminate.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
        }
    }

    fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId, lopdf::Error> {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return Ok(*target_id);
        }

        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        let obj = self.source.get_object(source_id)?.clone();
        let remapped = self.remap(obj)?;
        self.target.objects.insert(new_id, remapped);

        Ok(new_id)
    }

    fn remap(&mut self, obj: Object) -> Result<Object, lopdf::Error> {
        match obj {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(items) => Ok(Object::Array(
                items
                    .into_iter()
                    .map(|o| self.remap(o))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Object::Dictionary(mut dict) => {
                for (_, value) in dict.iter_mut() {
                    *value = self.remap(value.clone())?;
                }
                Ok(Object::Dictionary(dict))
            }
            Object::Stream(mut stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    *value = self.remap(value.clone())?;
                }
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }
}

/// Writes inherited attributes onto each page so pages survive being
/// re-parented into another page tree.
fn flatten_inherited(doc: &mut Document) -> Result<(), lopdf::Error> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let mut inherited = Vec::new();
        {
            let page = doc.get_object(page_id)?.as_dict()?;
            let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
            let mut missing: Vec<&[u8]> = INHERITABLE
                .iter()
                .copied()
                .filter(|key| !page.has(key))
                .collect();

            // Bounded walk; a malformed tree must not loop forever.
            let mut depth = 0;
            while let Some(parent_id) = parent {
                if missing.is_empty() || depth >= 64 {
                    break;
                }
                let node = doc.get_object(parent_id)?.as_dict()?;
                missing.retain(|key| match node.get(key) {
                    Ok(value) => {
                        inherited.push((key.to_vec(), value.clone()));
                        false
                    }
                    Err(_) => true,
                });
                parent = node.get(b"Parent").and_then(Object::as_reference).ok();
                depth += 1;
            }
        }

        if !inherited.is_empty() {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
    }
    Ok(())
}

fn append_pages(target: &mut Document, mut source: Document) -> Result<(), lopdf::Error> {
    flatten_inherited(&mut source)?;
    let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();

    let mut copier = ObjectCopier::new(&source, target);
    let mut copied = Vec::with_capacity(source_pages.len());
    for page_id in source_pages {
        copied.push(copier.copy_object(page_id)?);
    }

    let root_id = target.trailer.get(b"Root")?.as_reference()?;
    let pages_id = target
        .get_object(root_id)?
        .as_dict()?
        .get(b"Pages")?
        .as_reference()?;

    for page_id in &copied {
        if let Ok(Object::Dictionary(page)) = target.get_object_mut(*page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let pages = target.get_object_mut(pages_id)?.as_dict_mut()?;
    let mut kids = pages.get(b"Kids")?.as_array()?.clone();
    let count = pages.get(b"Count")?.as_i64()?;
    kids.extend(copied.iter().map(|id| Object::Reference(*id)));
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", count + copied.len() as i64);

    Ok(())
}

/// Concatenates `docs` in order into one document.
pub fn merge(docs: Vec<Document>) -> Result<Vec<u8>, RenderError> {
    let mut docs = docs.into_iter();
    let mut target = docs
        .next()
        .ok_or_else(|| RenderError::InvalidParams("merge needs at least one document".to_string()))?;
    flatten_inherited(&mut target).map_err(pdf_err)?;

    for source in docs {
        append_pages(&mut target, source).map_err(pdf_err)?;
    }

    // Drops the page tree nodes copied along with each source page.
    target.prune_objects();
    save(&mut target)
}

/// One PDF per range, each containing only that range's pages.
pub fn split(doc: &Document, ranges: &[PageRange]) -> Result<Vec<(PageRange, Vec<u8>)>, RenderError> {
    let total = page_count(doc);
    let mut parts = Vec::with_capacity(ranges.len());

    for range in ranges {
        if range.end > total {
            return Err(RenderError::InvalidParams(format!(
                "page range {} exceeds document length of {} pages",
                range.label(),
                total
            )));
        }

        let drop: Vec<u32> = (1..=total).filter(|p| !range.contains(*p)).collect();
        let mut part = doc.clone();
        if !drop.is_empty() {
            part.delete_pages(&drop);
        }
        part.prune_objects();
        parts.push((*range, save(&mut part)?));
    }

    Ok(parts)
}

/// Packs split parts into a zip with entries named `pages_<range>.pdf`.
pub fn zip_parts(parts: &[(PageRange, Vec<u8>)]) -> Result<Vec<u8>, RenderError> {
    let zip_err = |e: zip::result::ZipError| RenderError::Corrupt(format!("zip: {}", e));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (range, bytes) in parts {
        writer
            .start_file(format!("pages_{}.pdf", range.label()), options)
            .map_err(zip_err)?;
        writer.write_all(bytes).map_err(|e| RenderError::Corrupt(format!("zip: {}", e)))?;
    }
    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}
