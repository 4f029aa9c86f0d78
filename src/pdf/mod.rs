//! PDF manipulation module

pub mod content;
pub mod font;
pub mod metadata;
pub mod watermark;

// Re-export commonly used items
pub use metadata::{count_pages, extract_metadata, page_geometries, PageGeometry, PdfMetadata};
pub use watermark::{
    apply_watermark, watermark_document, watermark_pdf, WatermarkLayer, WatermarkSpec,
    WatermarkSummary,
};
