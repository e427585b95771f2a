//! Document merger: ordered PDFs → one PDF, by structural object copy.
//!
//! Every page of every input is deep-copied (with everything it references)
//! into a fresh document, inputs in the order given and pages in their
//! original order. Nothing is re-rasterised, deduplicated or reordered.
//!
//! All inputs are parsed before anything is copied, so an invalid input
//! fails the merge without producing partial output.

use crate::artifact::PdfArtifact;
use crate::error::{ReportError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use tracing::debug;

/// Page attributes a page may inherit from its `/Pages` ancestors.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Deep-copies objects from one document into another, remapping ids.
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

    /// Copy `source_id` and everything reachable from it; each object once.
    fn copy_object(&mut self, source_id: ObjectId) -> std::result::Result<ObjectId, lopdf::Error> {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return Ok(*target_id);
        }

        // Reserve the id before recursing so reference cycles terminate.
        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        let obj = self.source.get_object(source_id)?.clone();
        let new_obj = self.remap(obj)?;
        self.target.objects.insert(new_id, new_obj);
        Ok(new_id)
    }

    fn remap(&mut self, obj: Object) -> std::result::Result<Object, lopdf::Error> {
        match obj {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(items) => Ok(Object::Array(
                items
                    .into_iter()
                    .map(|o| self.remap(o))
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            )),
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.remap_dict(dict)?)),
            Object::Stream(mut stream) => {
                stream.dict = self.remap_dict(stream.dict)?;
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }

    fn remap_dict(&mut self, mut dict: Dictionary) -> std::result::Result<Dictionary, lopdf::Error> {
        for (_, value) in dict.iter_mut() {
            *value = self.remap(value.clone())?;
        }
        Ok(dict)
    }

    /// Copy one page without its `/Parent` link (which would drag the whole
    /// source page tree along), materialising inherited attributes.
    fn copy_page(&mut self, page_id: ObjectId, parent: ObjectId) -> std::result::Result<ObjectId, lopdf::Error> {
        let mut page = self.source.get_dictionary(page_id)?.clone();
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited(self.source, &page, key) {
                    page.set(key, value);
                }
            }
        }
        page.remove(b"Parent");

        // Reserved first: annotations (`/P`, link `/Dest`) may point back here.
        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(page_id, new_id);
        let mut page = self.remap_dict(page)?;
        page.set("Parent", Object::Reference(parent));
        self.target.objects.insert(new_id, Object::Dictionary(page));
        Ok(new_id)
    }
}

/// Walk up `/Parent` links looking for `key`.
fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut node = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk: malformed files can loop.
    for _ in 0..64 {
        let dict = doc.get_dictionary(node?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        node = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn load(index: usize, bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(|e| ReportError::merge(index, e.to_string()))?;
    if doc.get_pages().is_empty() {
        return Err(ReportError::merge(index, "document has no pages"));
    }
    Ok(doc)
}

/// Number of pages in a PDF.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    Ok(load(0, bytes)?.get_pages().len())
}

/// Concatenate `inputs`, in order, into one PDF.
pub fn merge(inputs: &[PdfArtifact]) -> Result<PdfArtifact> {
    merge_counted(inputs).map(|(merged, _)| merged)
}

/// [`merge`], also returning how many pages each input contributed.
pub fn merge_counted(inputs: &[PdfArtifact]) -> Result<(PdfArtifact, Vec<usize>)> {
    if inputs.is_empty() {
        return Err(ReportError::merge(0, "nothing to merge"));
    }

    let sources = inputs
        .iter()
        .enumerate()
        .map(|(i, a)| load(i, a.bytes()))
        .collect::<Result<Vec<_>>>()?;

    let mut target = Document::with_version("1.7");
    let pages_id = target.new_object_id();
    let mut kids = Vec::new();
    let mut counts = Vec::with_capacity(sources.len());

    for (index, source) in sources.iter().enumerate() {
        let mut copier = ObjectCopier::new(source, &mut target);
        // get_pages() is keyed by 1-based page number, so iteration is in page order.
        for page_id in source.get_pages().into_values() {
            let new_id = copier
                .copy_page(page_id, pages_id)
                .map_err(|e| ReportError::merge(index, e.to_string()))?;
            kids.push(Object::Reference(new_id));
        }
        let contributed = source.get_pages().len();
        debug!("merge: input #{} contributed {} page(s)", index, contributed);
        counts.push(contributed);
    }

    let count = kids.len() as i64;
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    // Index past the inputs: the merged document itself.
    target
        .save_to(&mut out)
        .map_err(|e| ReportError::merge(inputs.len(), format!("serialising merged PDF: {e}")))?;
    Ok((PdfArtifact::merged(out), counts))
}
