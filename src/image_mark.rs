//! Image watermark rendering.
//!
//! The watermark image is resized, its alpha scaled by the configured
//! opacity, optionally rotated into an expanded box, and pasted onto the
//! overlay next to the text box.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::blending::{composite_at, scale_alpha};
use crate::config::{short_side, ImageWatermarkConfig, Placement, ScaleBasis};
use crate::error::{Error, Result};
use crate::rotate::{is_upright, rotate_expanded};

/// Longest side a resized watermark may have, in pixels.
pub const MAX_MARK_SIDE: u32 = 16_384;

/// An overlay image together with how to size and place it.
#[derive(Debug, Clone)]
pub struct ImageWatermark {
    /// Source pixels. Non-alpha sources should be promoted to opaque RGBA.
    pub image: RgbaImage,
    /// Size, opacity and placement options.
    pub config: ImageWatermarkConfig,
}

impl ImageWatermark {
    /// Pair an image with its options.
    #[must_use]
    pub fn new(image: RgbaImage, config: ImageWatermarkConfig) -> Self {
        Self { image, config }
    }
}

/// Output dimensions of the resized watermark, aspect ratio preserved.
///
/// Each side is at least one pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn target_size(
    watermark: (u32, u32),
    base: (u32, u32),
    config: &ImageWatermarkConfig,
) -> (u32, u32) {
    let (ww, wh) = (f64::from(watermark.0), f64::from(watermark.1));
    let factor = match config.basis {
        ScaleBasis::OwnSize => f64::from(config.scale) / 100.0,
        ScaleBasis::TargetShortSide => {
            let own_short = f64::from(short_side(watermark.0, watermark.1).max(1));
            let target_short = f64::from(short_side(base.0, base.1)) * f64::from(config.scale) / 100.0;
            target_short / own_short
        }
    };
    (
        (ww * factor).round().max(1.0) as u32,
        (wh * factor).round().max(1.0) as u32,
    )
}

/// Top-left of a `mark` box attached to the text box at `text_anchor`.
///
/// Centering uses floor division, so odd differences lean up and left.
#[must_use]
pub fn placement_position(
    placement: Placement,
    text_anchor: (i64, i64),
    text_size: (u32, u32),
    mark: (u32, u32),
    spacing: i32,
) -> (i64, i64) {
    let (tx, ty) = text_anchor;
    let (tw, th) = (i64::from(text_size.0), i64::from(text_size.1));
    let (ww, wh) = (i64::from(mark.0), i64::from(mark.1));
    let spacing = i64::from(spacing);

    match placement {
        Placement::Below => (tx + (tw - ww).div_euclid(2), ty + th + spacing),
        Placement::Above => (tx + (tw - ww).div_euclid(2), ty - wh - spacing),
        Placement::Left => (tx - ww - spacing, ty + (th - wh).div_euclid(2)),
        Placement::Right => (tx + tw + spacing, ty + (th - wh).div_euclid(2)),
    }
}

/// Resize, fade and rotate the watermark for a base of `base` size.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for an empty watermark image,
/// out-of-range options, or a resized side above [`MAX_MARK_SIDE`].
pub fn prepare_watermark(watermark: &ImageWatermark, base: (u32, u32)) -> Result<RgbaImage> {
    watermark.config.validate()?;
    let src = &watermark.image;
    if src.width() == 0 || src.height() == 0 {
        return Err(Error::Configuration(
            "watermark image has no pixels".to_string(),
        ));
    }

    let (w, h) = target_size(src.dimensions(), base, &watermark.config);
    if w > MAX_MARK_SIDE || h > MAX_MARK_SIDE {
        return Err(Error::Configuration(format!(
            "image watermark would be {w}x{h} px, above the {MAX_MARK_SIDE} px limit"
        )));
    }
    let mut resized = if (w, h) == src.dimensions() {
        src.clone()
    } else {
        imageops::resize(src, w, h, FilterType::Lanczos3)
    };
    scale_alpha(&mut resized, watermark.config.opacity);

    let rotation = watermark.config.rotation;
    if is_upright(rotation) {
        Ok(resized)
    } else {
        Ok(rotate_expanded(&resized, rotation))
    }
}

/// Paste the image watermark onto `overlay`, attached to the text box.
///
/// Returns the top-left position the watermark was placed at. Parts that
/// fall outside the overlay are clipped.
///
/// # Errors
///
/// See [`prepare_watermark`].
pub fn render_image_watermark(
    overlay: &mut RgbaImage,
    watermark: &ImageWatermark,
    text_anchor: (i64, i64),
    text_size: (u32, u32),
) -> Result<(i64, i64)> {
    let mark = prepare_watermark(watermark, overlay.dimensions())?;
    let pos = placement_position(
        watermark.config.placement,
        text_anchor,
        text_size,
        mark.dimensions(),
        watermark.config.spacing,
    );
    composite_at(overlay, &mark, pos.0, pos.1);

    log::debug!(
        "image watermark {}x{} placed {} at ({}, {})",
        mark.width(),
        mark.height(),
        watermark.config.placement,
        pos.0,
        pos.1
    );
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_IMAGE_SCALE;
    use image::Rgba;

    fn own_size(scale: f32, opacity: u8) -> ImageWatermarkConfig {
        ImageWatermarkConfig {
            scale,
            basis: ScaleBasis::OwnSize,
            opacity,
            placement: Placement::Above,
            spacing: 5,
            rotation: 0.0,
        }
    }

    #[test]
    fn half_size_above_text_box() {
        let cfg = own_size(50.0, 80);
        let size = target_size((100, 100), (800, 600), &cfg);
        assert_eq!(size, (50, 50));
        let pos = placement_position(Placement::Above, (50, 500), (40, 20), size, 5);
        assert_eq!(pos, (45, 445));
    }

    #[test]
    fn placements_around_text_box() {
        let anchor = (100, 100);
        let text = (60, 20);
        let mark = (20, 10);
        assert_eq!(
            placement_position(Placement::Below, anchor, text, mark, 4),
            (120, 124)
        );
        assert_eq!(
            placement_position(Placement::Above, anchor, text, mark, 4),
            (120, 86)
        );
        assert_eq!(
            placement_position(Placement::Left, anchor, text, mark, 4),
            (76, 105)
        );
        assert_eq!(
            placement_position(Placement::Right, anchor, text, mark, 4),
            (164, 105)
        );
    }

    #[test]
    fn odd_centering_floors_toward_negative() {
        // (40 - 51) / 2 floors to -6
        let pos = placement_position(Placement::Below, (50, 0), (40, 20), (51, 10), 0);
        assert_eq!(pos, (44, 20));
    }

    #[test]
    fn target_short_side_scaling_preserves_aspect() {
        let cfg = ImageWatermarkConfig {
            scale: 20.0,
            basis: ScaleBasis::TargetShortSide,
            ..ImageWatermarkConfig::default()
        };
        // base short side 600 -> watermark short side 120
        assert_eq!(target_size((200, 100), (800, 600), &cfg), (240, 120));
        assert_eq!(target_size((50, 100), (600, 800), &cfg), (120, 240));
    }

    #[test]
    fn tiny_scale_keeps_one_pixel() {
        let cfg = own_size(0.1, 100);
        assert_eq!(target_size((10, 10), (100, 100), &cfg), (1, 1));
    }

    #[test]
    fn opacity_multiplies_existing_alpha() {
        let mut src = RgbaImage::from_pixel(100, 100, Rgba([10, 200, 30, 255]));
        src.put_pixel(0, 0, Rgba([10, 200, 30, 100]));
        let wm = ImageWatermark::new(src, own_size(100.0, 80));
        let out = prepare_watermark(&wm, (800, 600)).unwrap();
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.get_pixel(50, 50)[3], 204);
        assert_eq!(out.get_pixel(0, 0)[3], 80);
    }

    #[test]
    fn render_pastes_resized_mark() {
        let mut overlay = RgbaImage::new(800, 600);
        let wm = ImageWatermark::new(
            RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255])),
            own_size(50.0, 80),
        );
        let pos = render_image_watermark(&mut overlay, &wm, (50, 500), (40, 20)).unwrap();
        assert_eq!(pos, (45, 445));

        let inside = overlay.get_pixel(70, 470);
        assert!((203..=204).contains(&inside[3]), "alpha {}", inside[3]);
        assert!(inside[0] > 250);
        assert_eq!(overlay.get_pixel(44, 470)[3], 0);
        assert_eq!(overlay.get_pixel(70, 496)[3], 0);
    }

    #[test]
    fn mark_hanging_off_canvas_is_clipped() {
        let mut overlay = RgbaImage::new(50, 50);
        let wm = ImageWatermark::new(
            RgbaImage::from_pixel(40, 40, Rgba([0, 0, 255, 255])),
            own_size(100.0, 100),
        );
        let pos = render_image_watermark(&mut overlay, &wm, (10, 10), (0, 0)).unwrap();
        assert_eq!(pos, (-10, -35));
        assert_eq!(overlay.get_pixel(0, 0)[3], 255);
        assert_eq!(overlay.get_pixel(29, 4)[3], 255);
        assert_eq!(overlay.get_pixel(30, 0)[3], 0);
        assert_eq!(overlay.get_pixel(0, 5)[3], 0);
    }

    #[test]
    fn empty_watermark_is_rejected() {
        let wm = ImageWatermark::new(RgbaImage::new(0, 0), own_size(50.0, 100));
        assert!(matches!(
            prepare_watermark(&wm, (10, 10)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn oversized_mark_is_rejected_before_resizing() {
        // 1700 px at 1000% would be 17000 px wide
        let wm = ImageWatermark::new(
            RgbaImage::from_pixel(1700, 2, Rgba([0, 0, 0, 255])),
            own_size(MAX_IMAGE_SCALE, 100),
        );
        assert!(matches!(
            prepare_watermark(&wm, (800, 600)),
            Err(Error::Configuration(_))
        ));

        let wm = ImageWatermark::new(
            RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])),
            own_size(1e9, 100),
        );
        assert!(matches!(
            prepare_watermark(&wm, (800, 600)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn rotated_mark_swaps_box_and_placement_uses_it() {
        let mut src = RgbaImage::from_pixel(40, 20, Rgba([0, 255, 0, 255]));
        src.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let wm = ImageWatermark::new(
            src,
            ImageWatermarkConfig {
                rotation: 90.0,
                ..own_size(100.0, 100)
            },
        );
        let mark = prepare_watermark(&wm, (800, 600)).unwrap();
        assert_eq!(mark.dimensions(), (20, 40));
        assert_eq!(*mark.get_pixel(0, 39), Rgba([255, 0, 0, 255]));

        let mut overlay = RgbaImage::new(800, 600);
        let pos = render_image_watermark(&mut overlay, &wm, (100, 300), (60, 20)).unwrap();
        assert_eq!(
            pos,
            placement_position(Placement::Above, (100, 300), (60, 20), (20, 40), 5)
        );
        assert_eq!(pos, (120, 255));
    }

    #[test]
    fn zero_rotation_leaves_mark_untouched() {
        let src = RgbaImage::from_fn(12, 7, |x, y| {
            Rgba([
                u8::try_from(x * 20).unwrap(),
                u8::try_from(y * 30).unwrap(),
                9,
                255,
            ])
        });
        let wm = ImageWatermark::new(src.clone(), own_size(100.0, 100));
        assert_eq!(prepare_watermark(&wm, (100, 100)).unwrap(), src);
    }
}
