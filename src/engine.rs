//! Core watermark compositing engine.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::blending::{self, composite_at};
use crate::config::TextWatermarkConfig;
use crate::error::{Error, Result};
use crate::font::WatermarkFont;
use crate::image_mark::{self, ImageWatermark};
use crate::text;

/// Default JPEG quality for exported files.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

const OUTPUT_SUFFIX: &str = "_watermarked";

/// Everything needed to watermark one file.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Text watermark settings. Empty text draws no text.
    pub text: TextWatermarkConfig,
    /// Optional image watermark.
    pub image: Option<ImageWatermark>,
    /// JPEG output quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            text: TextWatermarkConfig::default(),
            image: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ProcessOptions {
    /// Check every option is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first invalid option.
    pub fn validate(&self) -> Result<()> {
        self.text.validate()?;
        if let Some(wm) = &self.image {
            wm.config.validate()?;
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Configuration(format!(
                "JPEG quality {} must be in 1-100",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the input file.
    pub path: PathBuf,
    /// Path the output was (or would have been) written to.
    pub output: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, output: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            output: output.to_path_buf(),
            success: false,
            message,
        }
    }
}

/// The watermark engine holding the resolved font.
///
/// Create once and reuse for every image; rendering never mutates it, so a
/// shared reference can be used from several threads.
#[derive(Debug, Clone, Default)]
pub struct WatermarkEngine {
    font: WatermarkFont,
}

impl WatermarkEngine {
    /// Engine using the bundled default font.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine using the given font.
    #[must_use]
    pub fn with_font(font: WatermarkFont) -> Self {
        Self { font }
    }

    /// The font text is drawn with.
    #[must_use]
    pub fn font(&self) -> &WatermarkFont {
        &self.font
    }

    /// Composite the watermark(s) onto `base` and return the result.
    ///
    /// Layers are applied in order: text shadow, glyphs, image watermark,
    /// then the whole overlay over the base. With text and an image, the
    /// image is placed relative to the text box; with an image alone, the
    /// image box itself is anchored at the text position and offsets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] before any rendering if an option is
    /// out of range.
    pub fn process(
        &self,
        base: &DynamicImage,
        text_config: &TextWatermarkConfig,
        image: Option<&ImageWatermark>,
    ) -> Result<RgbaImage> {
        text_config.validate()?;
        if let Some(wm) = image {
            wm.config.validate()?;
        }

        let mut canvas = base.to_rgba8();
        let size = canvas.dimensions();

        let text_layer = text::render_text(size, &self.font, text_config)?;
        let mut overlay = text_layer.overlay;

        if let Some(wm) = image {
            if text_layer.size == (0, 0) {
                let mark = image_mark::prepare_watermark(wm, size)?;
                let (x, y) = text::corner_anchor(
                    text_config.position,
                    size,
                    mark.dimensions(),
                    text_config.offset_x,
                    text_config.offset_y,
                );
                log::debug!("image-only watermark at ({x}, {y})");
                composite_at(&mut overlay, &mark, x, y);
            } else {
                image_mark::render_image_watermark(
                    &mut overlay,
                    wm,
                    text_layer.anchor,
                    text_layer.size,
                )?;
            }
        }

        composite_at(&mut canvas, &overlay, 0, 0);
        Ok(canvas)
    }

    /// Process a single image file: load, watermark, save.
    ///
    /// Returns a [`ProcessResult`] indicating success or failure. Nothing is
    /// written when loading, validation or rendering fails.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
        if let Err(e) = opts.validate() {
            return ProcessResult::failed(input, output, e.to_string());
        }
        if let Err(e) = output_format(output) {
            return ProcessResult::failed(input, output, e.to_string());
        }

        let base = match load_image(input) {
            Ok(img) => img,
            Err(e) => return ProcessResult::failed(input, output, format!("Failed to load: {e}")),
        };

        let rendered = match self.process(&base, &opts.text, opts.image.as_ref()) {
            Ok(img) => img,
            Err(e) => return ProcessResult::failed(input, output, format!("Failed to render: {e}")),
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ProcessResult::failed(
                        input,
                        output,
                        format!("Failed to create output directory: {e}"),
                    );
                }
            }
        }

        match save_image(&rendered, output, opts.jpeg_quality) {
            Ok(()) => {
                log::debug!("{} -> {}", input.display(), output.display());
                ProcessResult {
                    path: input.to_path_buf(),
                    output: output.to_path_buf(),
                    success: true,
                    message: "Watermark applied".to_string(),
                }
            }
            Err(e) => ProcessResult::failed(input, output, format!("Failed to save: {e}")),
        }
    }

    /// Process all supported images in a directory, writing same-named
    /// files into `output_dir`.
    ///
    /// When `output_dir` is `input_dir` itself, outputs get the
    /// [`default_output_path`] suffix instead so sources are never
    /// overwritten, and files that already carry the suffix are skipped.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// A failing file never stops the others; each gets its own
    /// [`ProcessResult`], in directory-name order.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    output_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };
        entries.sort();

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    input_dir,
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        let in_place = same_directory(input_dir, output_dir);
        if in_place {
            log::warn!(
                "output directory is the input directory, writing *{OUTPUT_SUFFIX}.* files alongside the originals"
            );
            entries.retain(|p| !has_output_suffix(p));
        }

        log::info!(
            "watermarking {} images from {} into {}",
            entries.len(),
            input_dir.display(),
            output_dir.display()
        );

        let run = |input_path: &PathBuf| {
            let output_path = if in_place {
                default_output_path(input_path)
            } else {
                input_path
                    .file_name()
                    .map_or_else(|| output_dir.to_path_buf(), |name| output_dir.join(name))
            };
            self.process_file(input_path, &output_path, opts)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(run).collect()
        }
    }
}

/// Open a base image.
///
/// # Errors
///
/// Returns [`Error::FileAccess`] if the file is missing or cannot be decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}

/// Open a watermark image, promoting non-alpha sources to opaque RGBA.
///
/// # Errors
///
/// Returns [`Error::FileAccess`] if the file is missing or cannot be decoded.
pub fn load_watermark(path: &Path) -> Result<RgbaImage> {
    Ok(load_image(path)?.to_rgba8())
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

fn output_format(path: &Path) -> Result<ImageFormat> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => Ok(format),
        _ => Err(Error::UnsupportedFormat(format!("{format:?}"))),
    }
}

/// Save a watermarked image, choosing the format from the extension.
///
/// JPEG and BMP drop the alpha channel; PNG and WebP keep it. The file is
/// encoded in memory first, so an encoder failure leaves no partial file.
///
/// # Errors
///
/// Returns an error if the format is unsupported, the quality is outside
/// 1-100, or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path, jpeg_quality: u8) -> Result<()> {
    let format = output_format(path)?;
    let mut buf = Cursor::new(Vec::new());

    match format {
        ImageFormat::Jpeg => {
            if !(1..=100).contains(&jpeg_quality) {
                return Err(Error::Configuration(format!(
                    "JPEG quality {jpeg_quality} must be in 1-100"
                )));
            }
            let rgb = blending::flatten(img);
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Bmp => {
            blending::flatten(img).write_to(&mut buf, ImageFormat::Bmp)?;
        }
        _ => {
            img.write_to(&mut buf, format)?;
        }
    }

    std::fs::write(path, buf.into_inner())?;
    Ok(())
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn has_output_suffix(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(OUTPUT_SUFFIX))
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_watermarked.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}{OUTPUT_SUFFIX}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageWatermarkConfig, Placement, Position, ScaleBasis};
    use image::{Rgb, RgbImage, Rgba};

    fn gray_base(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([90, 90, 90])))
    }

    #[test]
    fn empty_text_and_no_image_is_identity() {
        let engine = WatermarkEngine::new();
        let base = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 40, |x, y| {
            Rgb([u8::try_from(x * 4).unwrap(), u8::try_from(y * 6).unwrap(), 77])
        }));
        let out = engine
            .process(&base, &TextWatermarkConfig::default(), None)
            .unwrap();
        assert_eq!(out, base.to_rgba8());
    }

    #[test]
    fn invalid_opacity_fails_before_rendering() {
        let engine = WatermarkEngine::new();
        let cfg = TextWatermarkConfig {
            opacity: 150,
            ..TextWatermarkConfig::with_text("x")
        };
        let err = engine.process(&gray_base(10, 10), &cfg, None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn text_brightens_base_inside_its_box_only() {
        let engine = WatermarkEngine::new();
        let cfg = TextWatermarkConfig {
            opacity: 100,
            ..TextWatermarkConfig::with_text("TEST")
        };
        let base = gray_base(800, 600);
        let out = engine.process(&base, &cfg, None).unwrap();
        let layer = text::render_text((800, 600), engine.font(), &cfg).unwrap();
        let (ax, ay) = layer.anchor;

        assert_eq!(
            (ax + i64::from(layer.size.0), ay + i64::from(layer.size.1)),
            (790, 590)
        );
        assert!(out.pixels().any(|p| *p == Rgba([255, 255, 255, 255])));
        assert_eq!(*out.get_pixel(5, 5), Rgba([90, 90, 90, 255]));
    }

    #[test]
    fn image_only_watermark_is_anchored_at_corner() {
        let engine = WatermarkEngine::new();
        let wm = ImageWatermark::new(
            RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 255])),
            ImageWatermarkConfig {
                scale: 100.0,
                basis: ScaleBasis::OwnSize,
                opacity: 100,
                placement: Placement::Above,
                spacing: 5,
                rotation: 0.0,
            },
        );
        let cfg = TextWatermarkConfig {
            position: Position::BottomRight,
            offset_x: 10,
            offset_y: 10,
            ..TextWatermarkConfig::default()
        };
        let out = engine.process(&gray_base(100, 80), &cfg, Some(&wm)).unwrap();
        // 100 - 20 - 10 = 70, 80 - 10 - 10 = 60
        assert_eq!(*out.get_pixel(70, 60), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(89, 69), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(90, 69), Rgba([90, 90, 90, 255]));
        assert_eq!(*out.get_pixel(69, 60), Rgba([90, 90, 90, 255]));
    }

    #[test]
    fn image_with_text_sits_above_text_box() {
        let engine = WatermarkEngine::new();
        let cfg = TextWatermarkConfig {
            opacity: 100,
            position: Position::BottomLeft,
            ..TextWatermarkConfig::with_text("Logo")
        };
        let wm = ImageWatermark::new(
            RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])),
            ImageWatermarkConfig {
                scale: 100.0,
                basis: ScaleBasis::OwnSize,
                opacity: 100,
                placement: Placement::Above,
                spacing: 4,
                rotation: 0.0,
            },
        );
        let out = engine.process(&gray_base(400, 300), &cfg, Some(&wm)).unwrap();
        let layer = text::render_text((400, 300), engine.font(), &cfg).unwrap();
        let (x, y) = image_mark::placement_position(
            Placement::Above,
            layer.anchor,
            layer.size,
            (10, 10),
            4,
        );
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (x as u32, y as u32);
        assert_eq!(*out.get_pixel(x, y), Rgba([0, 0, 255, 255]));
        assert_eq!(*out.get_pixel(x + 9, y + 9), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn default_output_path_appends_watermarked_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_watermarked.jpg"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_watermarked.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.bmp")));
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn options_validation_checks_quality() {
        assert!(ProcessOptions::default().validate().is_ok());
        let bad = ProcessOptions {
            jpeg_quality: 0,
            ..ProcessOptions::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn save_rejects_unknown_extension() {
        let img = RgbaImage::new(2, 2);
        let err = save_image(&img, Path::new("/tmp/out.xyz"), 90).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
