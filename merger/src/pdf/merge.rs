use lopdf::{Document, Object, ObjectId, dictionary};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

/// Outcome of a merge run: the serialized PDF payload plus what
/// happened to each input along the way.
#[derive(Debug)]
pub struct MergeOutcome {
    /// The merged document, already serialized. Fully self-contained:
    /// it holds no references back into the input files.
    pub payload: Vec<u8>,
    /// Number of pages in the merged document. Always the sum of the
    /// page counts of the inputs that loaded successfully.
    pub page_count: usize,
    /// Inputs that could not be parsed and were left out of the merge.
    pub skipped: Vec<SkippedFile>,
}

/// One input file that failed to parse as a PDF.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("no input files provided")]
    NoInputs,
    #[error("merged document contains no pages")]
    NoPages,
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
}

/// Merge every file in `inputs` into a single PDF, preserving the order
/// of the slice and the page order within each file.
///
/// Inputs that fail to parse are skipped and reported in the outcome,
/// so one corrupt file does not sink the whole batch. If nothing
/// contributes a single page, the merge fails with [`MergeError::NoPages`].
///
/// Implementation inspired on the reference example from the
/// [lopdf repo here.](https://github.com/J-F-Liu/lopdf/blob/c320c1d9d90028ee64e668f0bbbe9815fae3fb44/examples/merge.rs)
pub fn merge_documents<P>(inputs: &[P]) -> Result<MergeOutcome, MergeError>
where
    P: AsRef<Path>,
{
    if inputs.is_empty() {
        return Err(MergeError::NoInputs);
    }

    let start_time = Instant::now();

    // The accumulator starts empty rather than adopting the first file
    // as a base: the first input is just as likely to be corrupt as any
    // other, and the skip policy must treat all of them the same.
    let mut merged = Document::with_version("1.5");

    // Next unused object number across all renumbered inputs
    let mut max_id: u32 = 1;

    // Pages in their final order. Kids is built from this vector, never
    // from object-id sort order, so submission order survives renumbering.
    let mut ordered_pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut carried_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut skipped: Vec<SkippedFile> = Vec::new();

    for input in inputs {
        let path = input.as_ref();
        match collect_document(path, &mut max_id) {
            Ok((pages, objects)) => {
                ordered_pages.extend(pages);
                carried_objects.extend(objects);
            }
            Err(error) => {
                tracing::warn!(
                    "Skipping unreadable input. file={} error={error}",
                    path.display()
                );
                skipped.push(SkippedFile {
                    filename: display_name(path),
                    reason: error.to_string(),
                });
            }
        }
    }

    if ordered_pages.is_empty() {
        return Err(MergeError::NoPages);
    }

    merged.objects.extend(carried_objects);

    let pages_id: ObjectId = (max_id, 0);
    max_id += 1;

    // Reparent every page onto the rebuilt Pages node
    let mut kids: Vec<Object> = Vec::with_capacity(ordered_pages.len());
    for (page_id, page_obj) in &ordered_pages {
        if let Ok(dict) = page_obj.as_dict() {
            let mut new_dict = dict.clone();
            new_dict.set("Parent", Object::Reference(pages_id));
            merged
                .objects
                .insert(*page_id, Object::Dictionary(new_dict));
            kids.push(Object::Reference(*page_id));
        }
    }

    let page_count = kids.len();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count as u32,
            "Kids" => kids,
        }),
    );

    let catalog_id: ObjectId = (max_id, 0);
    merged.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        }),
    );
    merged.trailer.set("Root", Object::Reference(catalog_id));

    // Make the ID space dense again before saving
    merged.max_id = catalog_id.0;
    merged.renumber_objects();

    let mut payload = Vec::new();
    merged.save_to(&mut payload).map_err(lopdf::Error::from)?;

    tracing::info!(
        "Merged PDF inputs. pages={page_count} skipped={} duration={:?}",
        skipped.len(),
        start_time.elapsed()
    );

    Ok(MergeOutcome {
        payload,
        page_count,
        skipped,
    })
}

/// Load one input and pull out its pages (in intra-document order) and
/// every supporting object, renumbered past `max_id` to avoid clashes.
/// Any failure here discards the whole file so a half-read document
/// never leaks partial objects into the accumulator.
fn collect_document(
    path: &Path,
    max_id: &mut u32,
) -> Result<(Vec<(ObjectId, Object)>, BTreeMap<ObjectId, Object>), lopdf::Error> {
    let mut doc = Document::load(path)?;

    doc.renumber_objects_with(*max_id);
    let next_id = doc.max_id + 1;

    // get_pages is keyed by page number, so iteration follows the
    // page tree order of the source document.
    let mut pages = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let mut page_dict = doc.get_object(page_id)?.as_dict()?.clone();

        // Pages may inherit these from ancestor Pages nodes, which get
        // dropped below. Pull the inherited values down onto the page
        // itself so the copy stays self-contained.
        for key in [
            b"Resources".as_slice(),
            b"MediaBox".as_slice(),
            b"CropBox".as_slice(),
            b"Rotate".as_slice(),
        ] {
            if !page_dict.has(key)
                && let Some(value) = inherited_attribute(&doc, page_id, key)
            {
                page_dict.set(key, value);
            }
        }

        pages.push((page_id, Object::Dictionary(page_dict)));
    }

    let mut objects = BTreeMap::new();
    for (object_id, object) in doc.objects.into_iter() {
        match object.type_name().unwrap_or(b"") {
            b"Catalog" | b"Pages" => {
                // No-op: Skip these, the merged document rebuilds them
            }
            b"Page" => {
                // No-op: Pages have been collected in order already
            }
            _ => {
                objects.insert(object_id, object);
            }
        }
    }

    *max_id = next_id;
    Ok((pages, objects))
}

/// Walks the Parent chain looking for an inheritable page attribute.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    loop {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
