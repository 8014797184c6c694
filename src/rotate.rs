//! Rotation of rendered marks about their center.
//!
//! Angles are in degrees, counter-clockwise as seen on screen. The output
//! canvas grows to hold the whole rotated image and uncovered corners stay
//! transparent. Quarter turns are exact pixel permutations; other angles
//! are resampled bilinearly on premultiplied alpha so transparent
//! neighbours never darken the edges.

use image::imageops;
use image::{Rgba, RgbaImage};

const ANGLE_EPSILON: f32 = 1e-3;

/// Reduce `degrees` to `[0, 360)`.
#[must_use]
pub fn normalize_degrees(degrees: f32) -> f32 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative angles up to exactly 360
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Number of counter-clockwise quarter turns, if `degrees` is one.
fn quarter_turns(degrees: f32) -> Option<u8> {
    let d = normalize_degrees(degrees);
    [(0u8, 0.0f32), (1, 90.0), (2, 180.0), (3, 270.0), (0, 360.0)]
        .into_iter()
        .find(|(_, angle)| (d - angle).abs() < ANGLE_EPSILON)
        .map(|(turns, _)| turns)
}

/// Whether `degrees` leaves an image unchanged.
#[must_use]
pub fn is_upright(degrees: f32) -> bool {
    quarter_turns(degrees) == Some(0)
}

/// Size of the expanded box holding a `size` box rotated by `degrees`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rotated_size(size: (u32, u32), degrees: f32) -> (u32, u32) {
    match quarter_turns(degrees) {
        Some(0 | 2) => size,
        Some(_) => (size.1, size.0),
        None => {
            let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
            let (w, h) = (f64::from(size.0), f64::from(size.1));
            // Shave float noise so an exact fit does not gain a pixel
            let fit = |v: f64| (v - 1e-6).ceil().max(0.0) as u32;
            (
                fit(w * cos.abs() + h * sin.abs()),
                fit(w * sin.abs() + h * cos.abs()),
            )
        }
    }
}

/// Rotate `image` counter-clockwise by `degrees` into an expanded canvas.
#[must_use]
pub fn rotate_expanded(image: &RgbaImage, degrees: f32) -> RgbaImage {
    match quarter_turns(degrees) {
        Some(0) => image.clone(),
        Some(1) => imageops::rotate270(image),
        Some(2) => imageops::rotate180(image),
        Some(3) => imageops::rotate90(image),
        _ => resample(image, degrees),
    }
}

#[allow(clippy::cast_precision_loss)]
fn resample(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let (dw, dh) = rotated_size(image.dimensions(), degrees);
    if image.width() == 0 || image.height() == 0 {
        return RgbaImage::new(dw, dh);
    }

    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
    let (scx, scy) = (f64::from(image.width()) / 2.0, f64::from(image.height()) / 2.0);
    let (dcx, dcy) = (f64::from(dw) / 2.0, f64::from(dh) / 2.0);

    RgbaImage::from_fn(dw, dh, |dx, dy| {
        let rx = f64::from(dx) + 0.5 - dcx;
        let ry = f64::from(dy) + 0.5 - dcy;
        // Inverse of a counter-clockwise turn on a y-down grid
        let sx = rx * cos - ry * sin + scx - 0.5;
        let sy = rx * sin + ry * cos + scy - 0.5;
        sample_bilinear(image, sx, sy)
    })
}

fn pixel_at(image: &RgbaImage, x: i64, y: i64) -> Option<&Rgba<u8>> {
    let x = u32::try_from(x).ok()?;
    let y = u32::try_from(y).ok()?;
    (x < image.width() && y < image.height()).then(|| image.get_pixel(x, y))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let mut rgb = [0.0f64; 3];
    let mut alpha = 0.0f64;
    for (tx, ty, weight) in taps {
        if weight <= 0.0 {
            continue;
        }
        let Some(p) = pixel_at(image, tx, ty) else {
            continue;
        };
        let a = f64::from(p[3]) * weight;
        for (acc, &c) in rgb.iter_mut().zip(&p.0[..3]) {
            *acc += f64::from(c) * a;
        }
        alpha += a;
    }

    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |v: f64| (v / alpha).round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(rgb[0]),
        channel(rgb[1]),
        channel(rgb[2]),
        alpha.round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(w: u32, h: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 255, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img
    }

    #[test]
    fn full_turns_are_identity() {
        let img = marked(30, 10);
        for deg in [0.0, 360.0, -360.0, 720.0] {
            assert_eq!(rotate_expanded(&img, deg), img, "{deg} degrees");
            assert!(is_upright(deg));
        }
        assert!(!is_upright(90.0));
        assert!(!is_upright(12.5));
    }

    #[test]
    fn quarter_turn_swaps_dimensions_counter_clockwise() {
        let img = marked(30, 10);
        let out = rotate_expanded(&img, 90.0);
        assert_eq!(out.dimensions(), (10, 30));
        assert_eq!(rotated_size((30, 10), 90.0), (10, 30));
        // Top-left swings down to bottom-left
        assert_eq!(*out.get_pixel(0, 29), Rgba([255, 0, 0, 255]));

        let back = rotate_expanded(&img, -90.0);
        assert_eq!(back.dimensions(), (10, 30));
        assert_eq!(*back.get_pixel(9, 0), Rgba([255, 0, 0, 255]));

        let flipped = rotate_expanded(&img, 180.0);
        assert_eq!(flipped.dimensions(), (30, 10));
        assert_eq!(*flipped.get_pixel(29, 9), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn diagonal_rotation_expands_box_with_clear_corners() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([0, 255, 0, 255]));
        let out = rotate_expanded(&img, 45.0);
        assert_eq!(out.dimensions(), (15, 15));
        assert_eq!(out.dimensions(), rotated_size((10, 10), 45.0));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(14, 14)[3], 0);
        assert_eq!(*out.get_pixel(7, 7), Rgba([0, 255, 0, 255]));
        assert!(out.pixels().filter(|p| p[3] > 0).all(|p| p[0] == 0 && p[1] == 255));
    }

    #[test]
    fn arbitrary_rotation_keeps_coverage() {
        let img = RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 200]));
        let before: f64 = img.pixels().map(|p| f64::from(p[3])).sum();
        for deg in [10.0, 33.0, 135.0, 300.0] {
            let out = rotate_expanded(&img, deg);
            assert_eq!(out.dimensions(), rotated_size((40, 20), deg));
            let after: f64 = out.pixels().map(|p| f64::from(p[3])).sum();
            let ratio = after / before;
            assert!((0.9..1.1).contains(&ratio), "{deg} degrees: coverage ratio {ratio}");
        }
    }

    #[test]
    fn normalize_wraps_into_range() {
        assert!((normalize_degrees(450.0) - 90.0).abs() < f32::EPSILON);
        assert!((normalize_degrees(-90.0) - 270.0).abs() < f32::EPSILON);
        assert!(normalize_degrees(-1e-9) < 360.0);
    }
}
