//! Text watermarks drawn onto every page of a PDF
//!
//! The watermark is drawn as a new content layer on each page, either beneath the
//! existing content or on top of it, with its own fill color and fill opacity.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use lopdf::{dictionary, Document, SaveOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::color::{parse_color, Rgb};
use crate::error::{Error, Result};
use crate::layout::{resolve_anchors, text_matrix, visual_to_user_space, PositionType};
use crate::pdf::content::{register_layer_resources, PageLayer};
use crate::pdf::font::{add_helvetica, encode_win_ansi, text_width, HELVETICA_ASCENT};
use crate::pdf::metadata::page_geometries;

/// Whether the watermark is drawn beneath or above existing page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WatermarkLayer {
    /// Drawn first; opaque page content covers it
    UnderContent,
    /// Drawn last; covers page content
    #[default]
    OverContent,
}

/// Everything that describes a watermark
///
/// Deserializes from the request field names used by clients
/// (`fontSize`, `watermarkLayer`, `positionType`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkSpec {
    /// Text to stamp
    pub text: String,
    /// Font size in points, must be positive
    pub font_size: f64,
    /// Beneath or above existing content
    #[serde(alias = "watermarkLayer")]
    pub layer: WatermarkLayer,
    /// Fill opacity, clamped to 0.0-1.0
    pub opacity: f64,
    /// Counter-clockwise rotation about the anchor, in degrees
    pub rotation_angle: f64,
    /// `#RRGGBB`, `#AARRGGBB` or a color name; unparsable values draw black
    #[serde(alias = "watermarkColor")]
    pub color: String,
    /// Where on the page the watermark goes
    #[serde(alias = "positionType")]
    pub position: PositionType,
    /// X coordinates for [`PositionType::Custom`]
    #[serde(alias = "customPositionXCoordinatesList")]
    pub custom_x: Vec<f64>,
    /// Y coordinates for [`PositionType::Custom`]
    #[serde(alias = "customPositionYCoordinatesList")]
    pub custom_y: Vec<f64>,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 48.0,
            layer: WatermarkLayer::OverContent,
            opacity: 0.5,
            rotation_angle: 0.0,
            color: "#000000".to_string(),
            position: PositionType::Center,
            custom_x: Vec::new(),
            custom_y: Vec::new(),
        }
    }
}

impl WatermarkSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Decode a watermark request
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_layer(mut self, layer: WatermarkLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_angle = degrees;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_position(mut self, position: PositionType) -> Self {
        self.position = position;
        self
    }

    /// Place an instance at every combination of `xs` and `ys`
    pub fn with_custom_positions(mut self, xs: Vec<f64>, ys: Vec<f64>) -> Self {
        self.position = PositionType::Custom;
        self.custom_x = xs;
        self.custom_y = ys;
        self
    }

    /// Check the numeric preconditions
    ///
    /// Values are drawn as `f32`, so anything that would overflow it is rejected
    /// along with NaN and infinities.
    pub fn validate(&self) -> Result<()> {
        if !fits_f32(self.font_size) || self.font_size <= 0.0 {
            return Err(Error::InvalidSpec(format!(
                "font size must be a positive number, got {}",
                self.font_size
            )));
        }
        if !self.opacity.is_finite() {
            return Err(Error::InvalidSpec(format!("opacity must be finite, got {}", self.opacity)));
        }
        if !self.rotation_angle.is_finite() {
            return Err(Error::InvalidSpec(format!(
                "rotation angle must be finite, got {}",
                self.rotation_angle
            )));
        }
        Ok(())
    }

    /// Check preconditions and convert to drawing units
    fn prepare(&self) -> Result<PreparedWatermark> {
        self.validate()?;

        let (color, parsed) = parse_color(&self.color);
        if !parsed {
            warn!(color = %self.color, "error parsing watermark color, using black");
        }

        // Only the custom position reads the coordinate lists
        let (xs, ys) = if self.position == PositionType::Custom {
            (to_points(&self.custom_x, "x")?, to_points(&self.custom_y, "y")?)
        } else {
            (Vec::new(), Vec::new())
        };

        let font_size = self.font_size as f32;
        let encoded = encode_win_ansi(&self.text);

        Ok(PreparedWatermark {
            text_width: text_width(&encoded, font_size),
            ascent: HELVETICA_ASCENT * font_size / 1000.0,
            encoded,
            font_size,
            opacity: self.opacity.clamp(0.0, 1.0) as f32,
            rotation: self.rotation_angle.rem_euclid(360.0) as f32,
            color,
            xs,
            ys,
        })
    }
}

/// Finite and within `f32` range
fn fits_f32(value: f64) -> bool {
    value.is_finite() && value.abs() <= f32::MAX as f64
}

fn to_points(values: &[f64], axis: &str) -> Result<Vec<f32>> {
    values
        .iter()
        .map(|&v| {
            if fits_f32(v) {
                Ok(v as f32)
            } else {
                Err(Error::InvalidSpec(format!(
                    "custom {} coordinate must be a finite f32, got {}",
                    axis, v
                )))
            }
        })
        .collect()
}

/// A validated spec in drawing units
#[derive(Debug)]
struct PreparedWatermark {
    encoded: Vec<u8>,
    font_size: f32,
    text_width: f32,
    ascent: f32,
    opacity: f32,
    rotation: f32,
    color: Rgb,
    xs: Vec<f32>,
    ys: Vec<f32>,
}

/// What a watermark pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkSummary {
    /// Pages processed
    pub pages: usize,
    /// Text instances drawn across all pages
    pub instances: usize,
}

/// Draw the watermark onto every page of an open document
///
/// Page geometry is read up front; pages are then processed in order, each
/// receiving its own content layer. Any failure aborts the whole pass.
pub fn watermark_document(doc: &mut Document, spec: &WatermarkSpec) -> Result<WatermarkSummary> {
    let watermark = spec.prepare()?;
    let pages = page_geometries(doc)?;

    let font_id = add_helvetica(doc);
    let ext_gstate_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => watermark.opacity,
    });

    let mut instances = 0;
    for page in &pages {
        let size = page.effective_size();
        debug!(
            page = page.number,
            width = size.width,
            height = size.height,
            rotation = page.rotation,
            "watermarking page"
        );

        let names = register_layer_resources(doc, page.id, font_id, ext_gstate_id)?;

        let mut layer = PageLayer::begin(visual_to_user_space(&page.page_box, page.rotation));
        layer.set_fill_rgb(watermark.color);
        layer.save_state();
        layer.set_ext_gstate(&names.ext_gstate);

        let anchors = resolve_anchors(spec.position, size, &watermark.xs, &watermark.ys);
        for anchor in &anchors {
            let matrix = text_matrix(*anchor, watermark.rotation, watermark.text_width, watermark.ascent);
            layer.show_text(&names.font, watermark.font_size, &matrix, &watermark.encoded);
        }

        layer.restore_state();
        layer.commit(doc, page.id, spec.layer)?;
        instances += anchors.len();
    }

    Ok(WatermarkSummary { pages: pages.len(), instances })
}

/// Watermark a PDF file into a new temporary file and return its path
///
/// The source is never modified: a private copy is parsed and the result is
/// written to a fresh temp file, which the caller owns afterwards. On failure
/// both temp files are removed.
///
/// # Example
///
/// ```no_run
/// use pdf_watermark::pdf::{apply_watermark, WatermarkLayer, WatermarkSpec};
/// use std::path::Path;
///
/// let spec = WatermarkSpec::new("DRAFT")
///     .with_font_size(24.0)
///     .with_layer(WatermarkLayer::OverContent)
///     .with_opacity(0.5)
///     .with_rotation(45.0)
///     .with_color("#FF0000");
///
/// let output = apply_watermark(Path::new("input.pdf"), &spec)
///     .expect("Failed to watermark");
/// println!("{}", output.display());
/// ```
pub fn apply_watermark(source_path: &Path, spec: &WatermarkSpec) -> Result<PathBuf> {
    let begin = Instant::now();

    if !source_path.exists() {
        return Err(Error::FileNotFound(source_path.to_path_buf()));
    }
    spec.validate()?;

    let working_copy = tempfile::Builder::new()
        .prefix("readerTempFile")
        .suffix(".pdf")
        .tempfile()?;
    std::fs::copy(source_path, working_copy.path())?;

    let mut output = tempfile::Builder::new()
        .prefix("writerTempFile")
        .suffix(".pdf")
        .tempfile()?;

    let mut doc = Document::load(working_copy.path())?;
    let summary = watermark_document(&mut doc, spec)?;

    doc.compress();
    let options = SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .compression_level(9)
        .build();
    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options)?;
    output.write_all(&buffer)?;
    output.flush()?;

    drop(doc);
    working_copy.close()?;

    let (_, output_path) = output.keep().map_err(|e| Error::Io(e.error))?;

    info!(
        source = %source_path.display(),
        output = %output_path.display(),
        pages = summary.pages,
        instances = summary.instances,
        elapsed_ms = begin.elapsed().as_millis() as u64,
        "watermark applied"
    );

    Ok(output_path)
}

/// Watermark `input_path` and move the result to `output_path`
pub fn watermark_pdf(input_path: &Path, output_path: &Path, spec: &WatermarkSpec) -> Result<()> {
    let temp_output = apply_watermark(input_path, spec)?;

    // Rename fails across filesystems; fall back to copy + remove
    if std::fs::rename(&temp_output, output_path).is_err() {
        let copied = std::fs::copy(&temp_output, output_path);
        let _ = std::fs::remove_file(&temp_output);
        copied?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults() {
        let spec = WatermarkSpec::new("DRAFT");
        assert_eq!(spec.text, "DRAFT");
        assert_eq!(spec.position, PositionType::Center);
        assert_eq!(spec.layer, WatermarkLayer::OverContent);
        assert!(spec.custom_x.is_empty());
    }

    #[test]
    fn test_prepare_rejects_bad_font_size() {
        for size in [0.0, -12.0, f64::NAN, f64::INFINITY] {
            let spec = WatermarkSpec::new("x").with_font_size(size);
            assert!(matches!(spec.prepare(), Err(Error::InvalidSpec(_))), "size {}", size);
        }
    }

    #[test]
    fn test_prepare_clamps_opacity_and_wraps_rotation() {
        let prepared = WatermarkSpec::new("x").with_opacity(1.7).with_rotation(-90.0).prepare().unwrap();
        assert_eq!(prepared.opacity, 1.0);
        assert_eq!(prepared.rotation, 270.0);

        let prepared = WatermarkSpec::new("x").with_opacity(-0.2).prepare().unwrap();
        assert_eq!(prepared.opacity, 0.0);
    }

    #[test]
    fn test_prepare_falls_back_to_black() {
        let prepared = WatermarkSpec::new("x").with_color("definitely-not-a-color").prepare().unwrap();
        assert_eq!(prepared.color, Rgb::BLACK);
    }

    #[test]
    fn test_prepare_converts_custom_coordinates_once() {
        let prepared = WatermarkSpec::new("x")
            .with_custom_positions(vec![100.0, 200.0], vec![300.0])
            .prepare()
            .unwrap();
        assert_eq!(prepared.xs, vec![100.0, 200.0]);
        assert_eq!(prepared.ys, vec![300.0]);

        let bad = WatermarkSpec::new("x").with_custom_positions(vec![f64::NAN], vec![1.0]);
        assert!(matches!(bad.prepare(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_prepare_rejects_values_beyond_f32() {
        let huge_font = WatermarkSpec::new("x").with_font_size(1e300);
        assert!(matches!(huge_font.validate(), Err(Error::InvalidSpec(_))));

        let huge_y = WatermarkSpec::new("x").with_custom_positions(vec![10.0], vec![-1e39]);
        assert!(matches!(huge_y.prepare(), Err(Error::InvalidSpec(_))));

        let largest = WatermarkSpec::new("x")
            .with_custom_positions(vec![f32::MAX as f64], vec![0.0])
            .prepare()
            .unwrap();
        assert_eq!(largest.xs, vec![f32::MAX]);
    }

    #[test]
    fn test_from_json_request_names() {
        let spec = WatermarkSpec::from_json(
            r##"{
                "text": "CONFIDENTIAL",
                "fontSize": 30,
                "watermarkLayer": "UnderContent",
                "opacity": 0.25,
                "rotationAngle": 45,
                "watermarkColor": "#00FF00",
                "positionType": "Custom",
                "customPositionXCoordinatesList": [10, 20],
                "customPositionYCoordinatesList": [30]
            }"##,
        )
        .unwrap();

        assert_eq!(spec.text, "CONFIDENTIAL");
        assert_eq!(spec.font_size, 30.0);
        assert_eq!(spec.layer, WatermarkLayer::UnderContent);
        assert_eq!(spec.rotation_angle, 45.0);
        assert_eq!(spec.color, "#00FF00");
        assert_eq!(spec.position, PositionType::Custom);
        assert_eq!(spec.custom_x, vec![10.0, 20.0]);
        assert_eq!(spec.custom_y, vec![30.0]);
    }

    #[test]
    fn test_from_json_unknown_position_is_center() {
        let spec = WatermarkSpec::from_json(r#"{"text": "x", "position": "Diagonal"}"#).unwrap();
        assert_eq!(spec.position, PositionType::Center);
        assert_eq!(spec.font_size, 48.0);
    }

    #[test]
    fn test_from_json_malformed() {
        let result = WatermarkSpec::from_json("{\"fontSize\": \"big\"}");
        assert!(matches!(result, Err(Error::Request(_))));
    }

    #[test]
    fn test_apply_watermark_missing_source() {
        let result = apply_watermark(Path::new("does-not-exist.pdf"), &WatermarkSpec::new("x"));
        let err = result.unwrap_err();
        assert!(err.is_document_error());
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
