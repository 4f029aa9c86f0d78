//! PDF page inspection
//!
//! Reads the page tree once and captures what the watermark pass needs about
//! every page before anything is modified.

use std::path::Path;
use lopdf::{Document, Object, ObjectId, Dictionary};
use crate::error::{Error, Result};
use crate::layout::{effective_size, normalize_rotation, PageBox, PageSize};

/// Geometry of one page, captured before the drawing pass
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    /// 1-based page number
    pub number: u32,
    /// Page dictionary object
    pub id: ObjectId,
    /// MediaBox, inherited if needed
    pub page_box: PageBox,
    /// `/Rotate` normalized to 0, 90, 180 or 270
    pub rotation: u16,
}

impl PageGeometry {
    /// Size of the page as displayed
    pub fn effective_size(&self) -> PageSize {
        effective_size(&self.page_box, self.rotation)
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Per-page geometry in page order
    pub pages: Vec<PageGeometry>,
}

/// Follow a reference to the object it points at
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up `/Parent` links for inheritable keys
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut current_id = page_id;

    // Bounded so a cyclic page tree can't hang us
    for _ in 0..64 {
        let dict = doc.get_object(current_id)?.as_dict()?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(resolve(doc, value)?));
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current_id = *parent_id,
            _ => return Ok(None),
        }
    }

    Ok(None)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn page_box_from(doc: &Document, object: &Object) -> Option<PageBox> {
    let array = object.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(array) {
        *slot = number(resolve(doc, item).ok()?)?;
    }

    let page_box = PageBox::from_corners(values[0], values[1], values[2], values[3]);
    if page_box.width() <= 0.0 || page_box.height() <= 0.0 {
        return None;
    }
    Some(page_box)
}

/// Read the geometry of a single page
pub fn page_geometry(doc: &Document, number: u32, id: ObjectId) -> Result<PageGeometry> {
    // Positions are laid out on the MediaBox; a CropBox does not move them
    let page_box = resolve_inherited(doc, id, b"MediaBox")?
        .and_then(|obj| page_box_from(doc, obj))
        .unwrap_or_else(PageBox::letter);

    let rotation = match resolve_inherited(doc, id, b"Rotate")? {
        Some(Object::Integer(r)) => normalize_rotation(*r),
        _ => 0,
    };

    Ok(PageGeometry { number, id, page_box, rotation })
}

/// Geometry of every page, in page order
pub fn page_geometries(doc: &Document) -> Result<Vec<PageGeometry>> {
    doc.get_pages()
        .into_iter()
        .map(|(number, id)| page_geometry(doc, number, id))
        .collect()
}

/// Count pages by reading the Count field from the Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Option<usize> {
    let catalog: &Dictionary = doc.catalog().ok()?;
    let pages = resolve(doc, catalog.get(b"Pages").ok()?).ok()?.as_dict().ok()?;

    match pages.get(b"Count").ok()? {
        Object::Integer(n) if *n >= 0 => Some(*n as usize),
        _ => None,
    }
}

/// Extract page metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let pages = page_geometries(&doc)?;

    Ok(PdfMetadata {
        page_count: pages.len(),
        pages,
    })
}

/// Count the number of pages in a PDF file
///
/// Uses the page tree's Count field, falling back to walking the tree when the
/// field is missing or malformed.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    Ok(count_pages_from_catalog(&doc).unwrap_or_else(|| doc.get_pages().len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn document_with_page(page: Dictionary, parent_extra: Dictionary) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut page = page;
        page.set("Type", "Page");
        page.set("Parent", pages_id);
        let page_id = doc.add_object(page);

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        for (key, value) in parent_extra.iter() {
            pages.set(key.clone(), value.clone());
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        (doc, page_id)
    }

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_geometry_uses_media_box_not_crop_box() {
        let (doc, page_id) = document_with_page(
            dictionary! {
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "CropBox" => vec![36.into(), 36.into(), 576.into(), 756.into()],
            },
            Dictionary::new(),
        );

        let geometry = page_geometry(&doc, 1, page_id).unwrap();
        assert_eq!(geometry.page_box, PageBox { llx: 0.0, lly: 0.0, urx: 612.0, ury: 792.0 });
        assert_eq!(geometry.effective_size(), PageSize { width: 612.0, height: 792.0 });
    }

    #[test]
    fn test_geometry_inherits_from_parent() {
        let (doc, page_id) = document_with_page(
            Dictionary::new(),
            dictionary! {
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Rotate" => 90,
            },
        );

        let geometry = page_geometry(&doc, 1, page_id).unwrap();
        assert_eq!(geometry.rotation, 90);
        assert_eq!(geometry.effective_size(), PageSize { width: 842.0, height: 595.0 });
    }

    #[test]
    fn test_geometry_defaults_to_letter() {
        let (doc, page_id) = document_with_page(Dictionary::new(), Dictionary::new());
        let geometry = page_geometry(&doc, 1, page_id).unwrap();
        assert_eq!(geometry.page_box, PageBox::letter());
        assert_eq!(geometry.rotation, 0);
    }

    #[test]
    fn test_page_geometries_in_order() {
        let (doc, page_id) = document_with_page(Dictionary::new(), Dictionary::new());
        let pages = page_geometries(&doc).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].id, page_id);
        assert_eq!(count_pages_from_catalog(&doc), Some(1));
    }
}
