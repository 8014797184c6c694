//! Alpha compositing primitives.
//!
//! Every layer step uses the Porter-Duff "over" operator:
//! `out_a = src_a + dst_a * (1 - src_a)` and
//! `out_c = (src_c * src_a + dst_c * dst_a * (1 - src_a)) / out_a`.
//! Against an opaque destination this reduces to
//! `out = src * src_a + dst * (1 - src_a)`.

use image::{GrayImage, Rgba, RgbaImage, RgbImage};

/// Composite a single source pixel over a destination pixel.
///
/// A fully transparent source leaves the destination bit-identical, and a
/// source over a fully transparent destination is copied unchanged.
#[must_use]
pub fn over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 || dst[3] == 0 {
        return src;
    }

    let sa = f32::from(sa) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let channel = |s: u8, d: u8| -> u8 {
        let c = (f32::from(s) * sa + f32::from(d) * da * (1.0 - sa)) / out_a;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            c.round().clamp(0.0, 255.0) as u8
        }
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let alpha = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        alpha,
    ])
}

/// Composite `src` over `dst` with its top-left corner at `(x, y)`.
///
/// Coordinates may be negative or past the far edge; the parts of `src`
/// outside `dst` are clipped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn composite_at(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let dst_w = i64::from(dst.width());
    let dst_h = i64::from(dst.height());

    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + i64::from(src.width())).min(dst_w);
    let y_end = (y + i64::from(src.height())).min(dst_h);

    if x_start >= x_end || y_start >= y_end {
        return;
    }

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let src_px = *src.get_pixel((tx - x) as u32, (ty - y) as u32);
            if src_px[3] == 0 {
                continue;
            }
            let dst_px = dst.get_pixel_mut(tx as u32, ty as u32);
            *dst_px = over(*dst_px, src_px);
        }
    }
}

/// Multiply every pixel's alpha by `opacity / 100`, flooring.
///
/// Partial transparency already in the image is preserved proportionally.
pub fn scale_alpha(image: &mut RgbaImage, opacity: u8) {
    let pct = u32::from(opacity.min(100));
    if pct == 100 {
        return;
    }
    for px in image.pixels_mut() {
        #[allow(clippy::cast_possible_truncation)]
        {
            px[3] = (u32::from(px[3]) * pct / 100) as u8;
        }
    }
}

/// Build a solid-colour RGBA layer whose alpha is `mask * alpha / 255`.
///
/// A mask value of 255 yields exactly `alpha`.
#[must_use]
pub fn tint_mask(mask: &GrayImage, rgb: [u8; 3], alpha: u8) -> RgbaImage {
    let alpha = u32::from(alpha);
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let coverage = u32::from(mask.get_pixel(x, y)[0]);
        #[allow(clippy::cast_possible_truncation)]
        let a = ((coverage * alpha + 127) / 255) as u8;
        Rgba([rgb[0], rgb[1], rgb[2], a])
    })
}

/// Drop the alpha channel, for output formats without transparency.
#[must_use]
pub fn flatten(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        image::Rgb([px[0], px[1], px[2]])
    })
}
