//! Text watermark rendering.
//!
//! Text is laid out on a single line with kerning, measured by the union of
//! its glyph pixel bounds (the ink box, not the line box), and drawn in
//! solid white onto a transparent overlay the size of the base image. The
//! ink box's top-left lands exactly on the computed anchor.
//!
//! With a shadow, the glyph coverage mask is blurred, the unblurred mask is
//! subtracted, and the remainder is drawn in black beneath the glyphs. A
//! fully covered glyph pixel therefore never carries any shadow.
//!
//! Rotated text is rendered upright, turned about its center, and the
//! expanded box of the rotated ink box is what gets anchored.

use ab_glyph::{point, Font, OutlinedGlyph, Point, ScaleFont};
use image::{GrayImage, Luma, RgbaImage};

use crate::blending::{composite_at, tint_mask};
use crate::config::{
    Position, ShadowConfig, TextWatermarkConfig, MAX_FONT_PIXELS, MAX_SHADOW_RADIUS,
};
use crate::error::{Error, Result};
use crate::font::WatermarkFont;
use crate::rotate::{is_upright, normalize_degrees, rotate_expanded, rotated_size};

/// Pixel budget for the unclipped layer a rotated text is drawn on.
const MAX_ROTATED_LAYER_PIXELS: u64 = 1 << 24;

/// Rendered text layer plus the geometry later layers are placed against.
#[derive(Debug, Clone)]
pub struct TextLayer {
    /// Transparent overlay the size of the base image.
    pub overlay: RgbaImage,
    /// Top-left of the box described by `size`, in base image coordinates.
    pub anchor: (i64, i64),
    /// Width and height of the ink box, or of the expanded box around the
    /// rotated ink box. `(0, 0)` for empty text.
    pub size: (u32, u32),
}

struct Layout {
    glyphs: Vec<OutlinedGlyph>,
    origin: Point,
    width: u32,
    height: u32,
}

fn layout(font: &WatermarkFont, text: &str, px: f32) -> Layout {
    let inner = font.inner();
    let scale = font.px_scale(px);
    let scaled = inner.as_scaled(scale);
    let baseline = scaled.ascent();

    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut prev = None;

    for c in text.chars().filter(|c| !c.is_control()) {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor_x += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(cursor_x, baseline));
        cursor_x += scaled.h_advance(id);
        prev = Some(id);

        if let Some(outlined) = inner.outline_glyph(glyph) {
            glyphs.push(outlined);
        }
    }

    let Some(first) = glyphs.first().map(OutlinedGlyph::px_bounds) else {
        return Layout {
            glyphs,
            origin: point(0.0, 0.0),
            width: 0,
            height: 0,
        };
    };

    let (mut min, mut max) = (first.min, first.max);
    for g in &glyphs[1..] {
        let b = g.px_bounds();
        min.x = min.x.min(b.min.x);
        min.y = min.y.min(b.min.y);
        max.x = max.x.max(b.max.x);
        max.y = max.y.max(b.max.y);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (width, height) = (
        (max.x - min.x).round().max(0.0) as u32,
        (max.y - min.y).round().max(0.0) as u32,
    );
    Layout {
        glyphs,
        origin: min,
        width,
        height,
    }
}

/// Width and height of the ink box of `text` at `px` pixels.
#[must_use]
pub fn measure_text(font: &WatermarkFont, text: &str, px: f32) -> (u32, u32) {
    let l = layout(font, text, px);
    (l.width, l.height)
}

/// Top-left anchor of a `size` box placed at `position` on a `base` image.
///
/// Offsets push the box inward from the anchored edges. `Center` ignores
/// offsets. Results may be negative when the box is larger than the image.
#[must_use]
pub fn corner_anchor(
    position: Position,
    base: (u32, u32),
    size: (u32, u32),
    offset_x: i32,
    offset_y: i32,
) -> (i64, i64) {
    let (w, h) = (i64::from(base.0), i64::from(base.1));
    let (tw, th) = (i64::from(size.0), i64::from(size.1));
    let (ox, oy) = (i64::from(offset_x), i64::from(offset_y));

    match position {
        Position::BottomRight => (w - tw - ox, h - th - oy),
        Position::BottomLeft => (ox, h - th - oy),
        Position::TopLeft => (ox, oy),
        Position::TopRight => (w - tw - ox, oy),
        Position::Center => ((w - tw).div_euclid(2), (h - th).div_euclid(2)),
    }
}

/// Rasterize glyph coverage into a `size` mask.
///
/// `origin` is the mask's top-left relative to the ink box's top-left, so
/// `(-pad, -pad)` leaves `pad` empty pixels around the text. Glyph pixels
/// outside the mask are dropped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn coverage_mask(layout: &Layout, origin: (i64, i64), size: (u32, u32)) -> GrayImage {
    let mut mask = GrayImage::new(size.0, size.1);
    let (mw, mh) = (i64::from(size.0), i64::from(size.1));

    for glyph in &layout.glyphs {
        let bounds = glyph.px_bounds();
        let (left, top) = (
            (bounds.min.x - layout.origin.x).round() as i64 - origin.0,
            (bounds.min.y - layout.origin.y).round() as i64 - origin.1,
        );
        let (gw, gh) = (bounds.width().ceil() as i64, bounds.height().ceil() as i64);
        if left + gw <= 0 || top + gh <= 0 || left >= mw || top >= mh {
            continue;
        }
        glyph.draw(|gx, gy, coverage| {
            let (x, y) = (left + i64::from(gx), top + i64::from(gy));
            if x < 0 || y < 0 || x >= mw || y >= mh {
                return;
            }
            let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            let px = mask.get_pixel_mut(x as u32, y as u32);
            // Overlapping glyph edges keep the stronger coverage
            if value > px[0] {
                *px = Luma([value]);
            }
        });
    }
    mask
}

/// Blurred glyph mask minus the glyph mask, saturating at zero.
///
/// Wherever `mask` is 255 the result is 0.
#[must_use]
pub fn shadow_mask(mask: &GrayImage, radius: f32) -> GrayImage {
    let blurred = image::imageops::blur(mask, radius);
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let b = blurred.get_pixel(x, y)[0];
        let m = mask.get_pixel(x, y)[0];
        Luma([b.saturating_sub(m)])
    })
}

fn active_shadow(shadow: Option<&ShadowConfig>) -> Option<&ShadowConfig> {
    shadow.filter(|s| s.radius > 0.0 && s.intensity > 0)
}

/// How a coverage mask turns into pixels.
struct GlyphStyle<'a> {
    pad: u32,
    glyph_alpha: u8,
    shadow: Option<&'a ShadowConfig>,
}

impl GlyphStyle<'_> {
    fn paint(&self, mask: &GrayImage) -> RgbaImage {
        let glyphs = tint_mask(mask, [255, 255, 255], self.glyph_alpha);
        match self.shadow {
            Some(s) => {
                let shade = shadow_mask(mask, s.radius);
                let strength = u32::from(self.glyph_alpha) * u32::from(s.intensity.min(100)) / 100;
                #[allow(clippy::cast_possible_truncation)]
                let mut layer = tint_mask(&shade, [0, 0, 0], strength as u8);
                composite_at(&mut layer, &glyphs, 0, 0);
                layer
            }
            None => glyphs,
        }
    }
}

/// Draw upright text with its ink box at `anchor`.
///
/// Only the part of the padded text box within `pad` of the canvas is
/// rasterized, so text hanging far off the image costs no memory.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_upright(
    overlay: &mut RgbaImage,
    layout: &Layout,
    anchor: (i64, i64),
    style: &GlyphStyle,
) {
    let pad = i64::from(style.pad);
    let (w, h) = (i64::from(overlay.width()), i64::from(overlay.height()));
    let (ax, ay) = anchor;
    let (tw, th) = (i64::from(layout.width), i64::from(layout.height));

    let (x0, y0) = ((ax - pad).max(-pad), (ay - pad).max(-pad));
    let (x1, y1) = ((ax + tw + pad).min(w + pad), (ay + th + pad).min(h + pad));
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let size = ((x1 - x0) as u32, (y1 - y0) as u32);
    let mask = coverage_mask(layout, (x0 - ax, y0 - ay), size);
    composite_at(overlay, &style.paint(&mask), x0, y0);
}

/// Draw text rotated by `rotation` degrees with its rotated ink box of
/// `size` at `anchor`.
fn draw_rotated(
    overlay: &mut RgbaImage,
    layout: &Layout,
    anchor: (i64, i64),
    size: (u32, u32),
    style: &GlyphStyle,
    rotation: f32,
) -> Result<()> {
    let pad = u64::from(style.pad);
    let (lw, lh) = (u64::from(layout.width) + 2 * pad, u64::from(layout.height) + 2 * pad);
    if lw * lh > MAX_ROTATED_LAYER_PIXELS {
        return Err(Error::Configuration(format!(
            "rotated text layer {lw}x{lh} is too large, shorten the text or reduce the font size"
        )));
    }

    let pad = i64::from(style.pad);
    #[allow(clippy::cast_possible_truncation)]
    let mask = coverage_mask(layout, (-pad, -pad), (lw as u32, lh as u32));
    let rotated = rotate_expanded(&style.paint(&mask), rotation);

    // Rotation is about the center, so the ink box stays centered in the layer
    let dx = (i64::from(rotated.width()) - i64::from(size.0)).div_euclid(2);
    let dy = (i64::from(rotated.height()) - i64::from(size.1)).div_euclid(2);
    composite_at(overlay, &rotated, anchor.0 - dx, anchor.1 - dy);
    Ok(())
}

/// Render the text watermark for a base image of `base_size`.
///
/// With a rotation, `size` and `anchor` describe the expanded box of the
/// rotated ink box.
///
/// # Errors
///
/// Returns [`crate::Error::Configuration`] if `config` is out of range, the
/// resolved font size exceeds [`MAX_FONT_PIXELS`], or a rotated text layer
/// would be unreasonably large.
pub fn render_text(
    base_size: (u32, u32),
    font: &WatermarkFont,
    config: &TextWatermarkConfig,
) -> Result<TextLayer> {
    config.validate()?;

    let px = config.font_size.to_pixels(base_size.0, base_size.1);
    if f64::from(px) > f64::from(MAX_FONT_PIXELS) {
        return Err(Error::Configuration(format!(
            "font size resolves to {px:.0} px, above the {MAX_FONT_PIXELS} px limit"
        )));
    }

    let mut overlay = RgbaImage::new(base_size.0, base_size.1);
    let layout = layout(font, &config.text, px);
    let ink = (layout.width, layout.height);
    let rotation = normalize_degrees(config.rotation);
    let upright = is_upright(rotation);
    let size = if upright { ink } else { rotated_size(ink, rotation) };
    let anchor = corner_anchor(
        config.position,
        base_size,
        size,
        config.offset_x,
        config.offset_y,
    );

    if ink.0 == 0 || ink.1 == 0 {
        return Ok(TextLayer {
            overlay,
            anchor,
            size: ink,
        });
    }

    let shadow = active_shadow(config.shadow.as_ref());
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pad = shadow.map_or(0, |s| (s.radius.min(MAX_SHADOW_RADIUS) * 3.0).ceil() as u32);
    let style = GlyphStyle {
        pad,
        glyph_alpha: config.glyph_alpha(),
        shadow,
    };

    if upright {
        draw_upright(&mut overlay, &layout, anchor, &style);
    } else {
        draw_rotated(&mut overlay, &layout, anchor, size, &style, rotation)?;
    }

    log::debug!(
        "text {:?}: {}x{} px at ({}, {}), {px:.1}px font, {rotation:.1} deg, alpha {}",
        config.text,
        size.0,
        size.1,
        anchor.0,
        anchor.1,
        style.glyph_alpha
    );

    Ok(TextLayer {
        overlay,
        anchor,
        size,
    })
}
