//! Page content layers
//!
//! A [`PageLayer`] collects drawing operations for one page and only touches the
//! document when it is committed. Dropping an uncommitted layer leaves the page
//! exactly as it was, and graphics-state saves are always balanced on commit.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::color::Rgb;
use crate::error::Result;
use crate::layout::TransformMatrix;
use crate::pdf::metadata::resolve_inherited;
use crate::pdf::watermark::WatermarkLayer;

/// Resource names a page uses to refer to the watermark font and graphics state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerResources {
    pub font: Vec<u8>,
    pub ext_gstate: Vec<u8>,
}

/// Drawing operations destined for one page
#[derive(Debug)]
pub struct PageLayer {
    operations: Vec<Operation>,
    depth: usize,
}

impl PageLayer {
    /// Start a layer whose coordinate space is mapped through `transform`
    pub fn begin(transform: TransformMatrix) -> Self {
        let mut layer = Self { operations: Vec::new(), depth: 0 };
        layer.save_state();
        if !transform.is_identity() {
            layer.push("cm", transform.to_array().iter().map(|&v| v.into()).collect());
        }
        layer
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    pub fn save_state(&mut self) {
        self.push("q", vec![]);
        self.depth += 1;
    }

    pub fn restore_state(&mut self) {
        if self.depth > 0 {
            self.push("Q", vec![]);
            self.depth -= 1;
        }
    }

    pub fn set_fill_rgb(&mut self, color: Rgb) {
        let (r, g, b) = color.to_unit();
        self.push("rg", vec![r.into(), g.into(), b.into()]);
    }

    pub fn set_ext_gstate(&mut self, name: &[u8]) {
        self.push("gs", vec![Object::Name(name.to_vec())]);
    }

    /// Show one run of already-encoded text placed by `matrix`
    pub fn show_text(&mut self, font: &[u8], font_size: f32, matrix: &TransformMatrix, encoded: &[u8]) {
        self.push("BT", vec![]);
        self.push("Tf", vec![Object::Name(font.to_vec()), font_size.into()]);
        self.push("Tm", matrix.to_array().iter().map(|&v| v.into()).collect());
        self.push("Tj", vec![Object::String(encoded.to_vec(), StringFormat::Literal)]);
        self.push("ET", vec![]);
    }

    /// Close every open state, write the layer as a new content stream and
    /// attach it beneath or above the page's existing content
    pub fn commit(mut self, doc: &mut Document, page_id: ObjectId, placement: WatermarkLayer) -> Result<ObjectId> {
        while self.depth > 0 {
            self.restore_state();
        }

        let encoded = Content { operations: self.operations }.encode()?;
        let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        match placement {
            WatermarkLayer::UnderContent => prepend_content_to_page(doc, page_id, stream_id)?,
            WatermarkLayer::OverContent => {
                wrap_page_content_in_graphics_state(doc, page_id)?;
                append_content_to_page(doc, page_id, stream_id)?;
            }
        }

        Ok(stream_id)
    }
}

/// Content stream references of a page, with an indirect Contents array flattened
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;

    let refs = match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(arr) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => vec![],
    };

    Ok(refs)
}

fn set_contents(doc: &mut Document, page_id: ObjectId, contents: Vec<Object>) -> Result<()> {
    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

/// Prepend a content stream so it is drawn before (beneath) existing content
fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = content_refs(doc, page_id)?;
    contents.insert(0, Object::Reference(new_content_id));
    set_contents(doc, page_id, contents)
}

/// Append a content stream so it is drawn after (on top of) existing content
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = content_refs(doc, page_id)?;
    contents.push(Object::Reference(new_content_id));
    set_contents(doc, page_id, contents)
}

/// Wrap existing page content in q/Q so its leftover CTM and colors can't leak
/// into streams appended after it
fn wrap_page_content_in_graphics_state(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut contents = content_refs(doc, page_id)?;
    if contents.is_empty() {
        return Ok(());
    }

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    contents.insert(0, Object::Reference(save_id));
    contents.push(Object::Reference(restore_id));
    set_contents(doc, page_id, contents)
}

/// First `<prefix><n>` not already used in `dict`
fn unique_name(dict: &Dictionary, prefix: &str) -> Vec<u8> {
    (1..)
        .map(|n| format!("{}{}", prefix, n).into_bytes())
        .find(|name| !dict.has(name))
        .unwrap_or_else(|| prefix.as_bytes().to_vec())
}

/// Resolve a resource category (`/Font`, `/ExtGState`) to an owned dictionary
fn subdictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    match resources.get(key) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(|obj| obj.as_dict())
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}

/// Register the watermark font and graphics state in a page's Resources
///
/// Inherited or indirect Resources are copied onto the page first so other pages
/// sharing them are untouched. Names are chosen to avoid existing entries.
pub fn register_layer_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    ext_gstate_id: ObjectId,
) -> Result<LayerResources> {
    // First, get the resources dictionary (may be inherited or indirect)
    let (mut resources, mut fonts, mut gstates) = {
        let resources = match resolve_inherited(doc, page_id, b"Resources")? {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let fonts = subdictionary(doc, &resources, b"Font");
        let gstates = subdictionary(doc, &resources, b"ExtGState");
        (resources, fonts, gstates)
    };

    let font_name = unique_name(&fonts, "WmF");
    fonts.set(font_name.clone(), Object::Reference(font_id));

    let gstate_name = unique_name(&gstates, "WmGS");
    gstates.set(gstate_name.clone(), Object::Reference(ext_gstate_id));

    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(gstates));

    // Now modify the page with the updated resources
    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(LayerResources { font: font_name, ext_gstate: gstate_name })
}

/// Decoded operations of every content stream on a page, in drawing order
pub fn page_operations(doc: &Document, page_id: ObjectId) -> Result<Vec<Operation>> {
    let bytes = doc.get_page_content(page_id)?;
    Ok(Content::decode(&bytes)?.operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn single_page_doc(contents: Option<&[u8]>) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        if let Some(bytes) = contents {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), bytes.to_vec()));
            page.set("Contents", content_id);
        }
        let page_id = doc.add_object(page);

        doc.objects.insert(pages_id, Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        (doc, page_id)
    }

    fn operators(doc: &Document, page_id: ObjectId) -> Vec<String> {
        page_operations(doc, page_id)
            .unwrap()
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn test_layer_is_balanced_on_commit() {
        let (mut doc, page_id) = single_page_doc(None);

        let mut layer = PageLayer::begin(TransformMatrix::identity());
        layer.save_state();
        layer.save_state();
        layer.commit(&mut doc, page_id, WatermarkLayer::OverContent).unwrap();

        assert_eq!(operators(&doc, page_id), vec!["q", "q", "q", "Q", "Q", "Q"]);
    }

    #[test]
    fn test_begin_emits_cm_only_when_needed() {
        let (mut doc, page_id) = single_page_doc(None);
        PageLayer::begin(TransformMatrix::translate(10.0, 0.0))
            .commit(&mut doc, page_id, WatermarkLayer::OverContent)
            .unwrap();
        assert_eq!(operators(&doc, page_id), vec!["q", "cm", "Q"]);
    }

    #[test]
    fn test_under_content_is_prepended() {
        let (mut doc, page_id) = single_page_doc(Some(b"0 0 m 10 10 l S".as_slice()));

        let stream_id = PageLayer::begin(TransformMatrix::identity())
            .commit(&mut doc, page_id, WatermarkLayer::UnderContent)
            .unwrap();

        let refs = content_refs(&doc, page_id).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].as_reference().unwrap(), stream_id);
        assert_eq!(operators(&doc, page_id), vec!["q", "Q", "m", "l", "S"]);
    }

    #[test]
    fn test_over_content_wraps_and_appends() {
        let (mut doc, page_id) = single_page_doc(Some(b"2 0 0 2 0 0 cm".as_slice()));

        let stream_id = PageLayer::begin(TransformMatrix::identity())
            .commit(&mut doc, page_id, WatermarkLayer::OverContent)
            .unwrap();

        let refs = content_refs(&doc, page_id).unwrap();
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[3].as_reference().unwrap(), stream_id);
        assert_eq!(operators(&doc, page_id), vec!["q", "cm", "Q", "q", "Q"]);
    }

    #[test]
    fn test_dropped_layer_leaves_page_untouched() {
        let (doc, page_id) = single_page_doc(Some(b"0 0 m".as_slice()));
        let objects_before = doc.objects.len();

        let mut layer = PageLayer::begin(TransformMatrix::identity());
        layer.set_fill_rgb(Rgb::BLACK);
        drop(layer);

        assert_eq!(doc.objects.len(), objects_before);
        assert_eq!(content_refs(&doc, page_id).unwrap().len(), 1);
        assert_eq!(operators(&doc, page_id), vec!["m"]);
    }

    #[test]
    fn test_register_resources_avoids_existing_names() {
        let (mut doc, page_id) = single_page_doc(None);
        let existing_font = doc.add_object(dictionary! { "Type" => "Font" });
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Resources", dictionary! {
                "Font" => dictionary! { "WmF1" => existing_font },
            });

        let font_id = doc.add_object(dictionary! { "Type" => "Font" });
        let gs_id = doc.add_object(dictionary! { "Type" => "ExtGState" });
        let names = register_layer_resources(&mut doc, page_id, font_id, gs_id).unwrap();

        assert_eq!(names.font, b"WmF2".to_vec());
        assert_eq!(names.ext_gstate, b"WmGS1".to_vec());

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let fonts = page.get(b"Resources").unwrap().as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"WmF1").unwrap().as_reference().unwrap(), existing_font);
        assert_eq!(fonts.get(b"WmF2").unwrap().as_reference().unwrap(), font_id);
    }

    #[test]
    fn test_register_resources_copies_inherited_dictionary() {
        let (mut doc, page_id) = single_page_doc(None);
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        let inherited_font = doc.add_object(dictionary! { "Type" => "Font" });
        doc.get_object_mut(pages_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Resources", dictionary! {
                "Font" => dictionary! { "F1" => inherited_font },
            });

        let font_id = doc.add_object(dictionary! { "Type" => "Font" });
        let gs_id = doc.add_object(dictionary! { "Type" => "ExtGState" });
        register_layer_resources(&mut doc, page_id, font_id, gs_id).unwrap();

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let fonts = page.get(b"Resources").unwrap().as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"WmF1"));
    }
}
