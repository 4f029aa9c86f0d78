//! PDF Watermark Library
//!
//! A cross-platform library for stamping text watermarks onto PDF pages.
//! This library provides functionality to:
//! - Draw a text watermark beneath or above the content of every page
//! - Place it at one of nine page positions or at custom coordinates
//! - Control font size, color, fill opacity and rotation
//! - Inspect page counts and effective page sizes
//!
//! # Example
//!
//! ```no_run
//! use pdf_watermark::layout::PositionType;
//! use pdf_watermark::pdf::{apply_watermark, WatermarkSpec};
//! use std::path::Path;
//!
//! let spec = WatermarkSpec::new("CONFIDENTIAL")
//!     .with_opacity(0.3)
//!     .with_rotation(45.0)
//!     .with_position(PositionType::Center);
//!
//! let output = apply_watermark(Path::new("report.pdf"), &spec)
//!     .expect("Failed to watermark PDF");
//! ```

pub mod color;
pub mod error;
pub mod layout;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, Result};
