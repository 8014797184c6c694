//! Overlay text and image watermarks onto photographs.
//!
//! The engine is a pure function from a base image and a watermark
//! configuration to a new image: a transparent overlay receives an optional
//! drop shadow, the white text glyphs, and an optional image watermark
//! placed beside the text, then the overlay is alpha-composited onto the
//! base with the Porter-Duff "over" operator. Text and image may each be
//! rotated about their centers.
//!
//! # Quick Start
//!
//! ```no_run
//! use photo_watermark::{TextWatermarkConfig, WatermarkEngine, Position};
//!
//! let engine = WatermarkEngine::new();
//! let photo = image::open("photo.jpg").unwrap();
//! let text = TextWatermarkConfig {
//!     position: Position::BottomRight,
//!     opacity: 60,
//!     ..TextWatermarkConfig::with_text("© 2026 Jane Doe")
//! };
//! let out = engine.process(&photo, &text, None).unwrap();
//! photo_watermark::save_image(&out, "photo_watermarked.jpg".as_ref(), 95).unwrap();
//! ```
//!
//! # Batch export
//!
//! ```no_run
//! use photo_watermark::{ProcessOptions, TextWatermarkConfig, WatermarkEngine};
//!
//! let engine = WatermarkEngine::new();
//! let opts = ProcessOptions {
//!     text: TextWatermarkConfig::with_text("sample"),
//!     ..ProcessOptions::default()
//! };
//! let results = engine.process_directory("in".as_ref(), "out".as_ref(), &opts);
//! let failed = results.iter().filter(|r| !r.success).count();
//! println!("{} done, {failed} failed", results.len() - failed);
//! ```

#![deny(missing_docs)]

pub mod blending;
pub mod config;
mod engine;
pub mod error;
pub mod font;
pub mod image_mark;
pub mod rotate;
pub mod text;

pub use config::{
    opacity_to_alpha, parse_percent, FontSize, ImageWatermarkConfig, Placement, Position,
    ScaleBasis, ShadowConfig, TextWatermarkConfig, MAX_FONT_PIXELS, MAX_IMAGE_SCALE,
    MAX_SHADOW_RADIUS,
};
pub use engine::{
    default_output_path, is_supported_image, load_image, load_watermark, save_image,
    ProcessOptions, ProcessResult, WatermarkEngine, DEFAULT_JPEG_QUALITY,
};
pub use error::{Error, Result};
pub use font::{system_font_candidates, WatermarkFont};
pub use image_mark::{render_image_watermark, ImageWatermark, MAX_MARK_SIDE};
pub use rotate::{rotate_expanded, rotated_size};
pub use text::{corner_anchor, measure_text, render_text, TextLayer};
