//! Watermark configuration records.
//!
//! Every knob a front-end exposes is a plain field here. Enums and sizes
//! implement [`FromStr`] so text-field input parses with the same rules as
//! the command line, and [`TextWatermarkConfig::validate`] /
//! [`ImageWatermarkConfig::validate`] reject out-of-range values before any
//! pixel is touched.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Largest pixel font size accepted, before or after resolving a percentage.
pub const MAX_FONT_PIXELS: u32 = 2000;

/// Largest shadow blur radius accepted, in pixels.
pub const MAX_SHADOW_RADIUS: f32 = 100.0;

/// Largest image watermark scale accepted, in percent.
pub const MAX_IMAGE_SCALE: f32 = 1000.0;

/// Where the text box is anchored on the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Bottom-right corner, offsets measured from the right and bottom edges.
    #[default]
    BottomRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Centered on the image. Offsets are ignored.
    Center,
}

impl Position {
    /// All positions, in display order.
    pub const ALL: [Position; 5] = [
        Position::BottomRight,
        Position::BottomLeft,
        Position::TopLeft,
        Position::TopRight,
        Position::Center,
    ];

    /// Canonical kebab-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::Center => "center",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "bottom-right" | "br" => Ok(Position::BottomRight),
            "bottom-left" | "bl" => Ok(Position::BottomLeft),
            "top-left" | "tl" => Ok(Position::TopLeft),
            "top-right" | "tr" => Ok(Position::TopRight),
            "center" | "centre" | "c" => Ok(Position::Center),
            other => Err(Error::Configuration(format!(
                "unknown position '{other}' (expected bottom-right, bottom-left, top-left, top-right or center)"
            ))),
        }
    }
}

/// Side of the text box an image watermark is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Centered horizontally, above the text.
    #[default]
    Above,
    /// Centered horizontally, below the text.
    Below,
    /// Centered vertically, left of the text.
    Left,
    /// Centered vertically, right of the text.
    Right,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Placement::Above => "above",
            Placement::Below => "below",
            Placement::Left => "left",
            Placement::Right => "right",
        })
    }
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" | "top" => Ok(Placement::Above),
            "below" | "bottom" => Ok(Placement::Below),
            "left" => Ok(Placement::Left),
            "right" => Ok(Placement::Right),
            other => Err(Error::Configuration(format!(
                "unknown placement '{other}' (expected above, below, left or right)"
            ))),
        }
    }
}

/// Text size, absolute or relative to the base image's short side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSize {
    /// Em size in pixels.
    Pixels(u32),
    /// Percentage of `min(width, height)` of the base image.
    Percent(f32),
}

impl Default for FontSize {
    fn default() -> Self {
        FontSize::Pixels(40)
    }
}

impl FontSize {
    /// Resolve to pixels for a base image of the given size.
    #[must_use]
    pub fn to_pixels(self, base_width: u32, base_height: u32) -> f32 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            FontSize::Pixels(px) => px as f32,
            #[allow(clippy::cast_precision_loss)]
            FontSize::Percent(pct) => short_side(base_width, base_height) as f32 * pct / 100.0,
        }
    }

    fn validate(self) -> Result<()> {
        match self {
            FontSize::Pixels(0) => Err(Error::Configuration(
                "font size must be at least 1 px".to_string(),
            )),
            FontSize::Pixels(px) if px > MAX_FONT_PIXELS => Err(Error::Configuration(format!(
                "font size {px} px exceeds {MAX_FONT_PIXELS} px"
            ))),
            FontSize::Percent(pct) if !(pct > 0.0 && pct <= 100.0) => Err(Error::Configuration(
                format!("font size {pct}% must be in (0, 100]"),
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for FontSize {
    type Err = Error;

    /// `"40"` and `"40px"` are pixels, `"5%"` is a percentage.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let pct: f32 = pct.trim().parse().map_err(|_| {
                Error::Configuration(format!("font size '{s}' is not a number"))
            })?;
            let size = FontSize::Percent(pct);
            size.validate()?;
            return Ok(size);
        }
        let px = s.strip_suffix("px").unwrap_or(s).trim();
        let px: u32 = px
            .parse()
            .map_err(|_| Error::Configuration(format!("font size '{s}' is not a number")))?;
        let size = FontSize::Pixels(px);
        size.validate()?;
        Ok(size)
    }
}

/// Drop shadow drawn beneath the glyphs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConfig {
    /// Gaussian blur radius in pixels. Zero disables the shadow.
    pub radius: f32,
    /// Shadow strength as a percentage of the text opacity.
    pub intensity: u8,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            radius: 4.0,
            intensity: 60,
        }
    }
}

/// Options for the text watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct TextWatermarkConfig {
    /// Text to draw. Empty means no text layer.
    pub text: String,
    /// Glyph size.
    pub font_size: FontSize,
    /// Opacity percentage, 0-100.
    pub opacity: u8,
    /// Anchor position of the text box.
    pub position: Position,
    /// Horizontal distance from the anchored edge, in pixels.
    pub offset_x: i32,
    /// Vertical distance from the anchored edge, in pixels.
    pub offset_y: i32,
    /// Optional drop shadow.
    pub shadow: Option<ShadowConfig>,
    /// Counter-clockwise rotation of the text box in degrees.
    pub rotation: f32,
}

impl Default for TextWatermarkConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: FontSize::default(),
            opacity: 50,
            position: Position::default(),
            offset_x: 10,
            offset_y: 10,
            shadow: None,
            rotation: 0.0,
        }
    }
}

impl TextWatermarkConfig {
    /// Text config with the given string and default styling.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Check every knob is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        check_percent("text opacity", self.opacity)?;
        self.font_size.validate()?;
        if let Some(shadow) = &self.shadow {
            check_percent("shadow intensity", shadow.intensity)?;
            if !(0.0..=MAX_SHADOW_RADIUS).contains(&shadow.radius) {
                return Err(Error::Configuration(format!(
                    "shadow radius {} must be in 0-{MAX_SHADOW_RADIUS} px",
                    shadow.radius
                )));
            }
        }
        check_rotation("text rotation", self.rotation)
    }

    /// Glyph alpha for a fully covered pixel.
    #[must_use]
    pub fn glyph_alpha(&self) -> u8 {
        opacity_to_alpha(self.opacity)
    }
}

/// Reference dimension for image watermark scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleBasis {
    /// Scale relative to the watermark image's own dimensions.
    OwnSize,
    /// Scale so the watermark's short side is a fraction of the base short side.
    #[default]
    TargetShortSide,
}

impl FromStr for ScaleBasis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "own" | "own-size" | "self" => Ok(ScaleBasis::OwnSize),
            "target" | "target-short-side" | "image" => Ok(ScaleBasis::TargetShortSide),
            other => Err(Error::Configuration(format!(
                "unknown scale basis '{other}' (expected own or target)"
            ))),
        }
    }
}

/// Options for the image watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageWatermarkConfig {
    /// Scale percentage, interpreted against `basis`.
    pub scale: f32,
    /// What `scale` is a percentage of.
    pub basis: ScaleBasis,
    /// Opacity percentage, 0-100, multiplied into the source alpha.
    pub opacity: u8,
    /// Side of the text box to attach to.
    pub placement: Placement,
    /// Gap between text box and image, in pixels.
    pub spacing: i32,
    /// Counter-clockwise rotation of the resized image in degrees.
    pub rotation: f32,
}

impl Default for ImageWatermarkConfig {
    fn default() -> Self {
        Self {
            scale: 20.0,
            basis: ScaleBasis::default(),
            opacity: 100,
            placement: Placement::default(),
            spacing: 10,
            rotation: 0.0,
        }
    }
}

impl ImageWatermarkConfig {
    /// Check every knob is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        check_percent("image opacity", self.opacity)?;
        if !(self.scale > 0.0 && self.scale <= MAX_IMAGE_SCALE) {
            return Err(Error::Configuration(format!(
                "image scale {}% must be in (0, {MAX_IMAGE_SCALE}]",
                self.scale
            )));
        }
        check_rotation("image rotation", self.rotation)
    }
}

/// `min(width, height)`.
#[must_use]
pub fn short_side(width: u32, height: u32) -> u32 {
    width.min(height)
}

/// Convert an opacity percentage to an 8-bit alpha with integer floor.
///
/// `50` maps to `127`. Values above 100 saturate at 255.
#[must_use]
pub fn opacity_to_alpha(opacity: u8) -> u8 {
    let pct = u32::from(opacity.min(100));
    #[allow(clippy::cast_possible_truncation)]
    {
        (pct * 255 / 100) as u8
    }
}

/// Parse a percentage knob typed as text, such as `"50"` or `"50%"`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for non-numeric input or values above 100.
pub fn parse_percent(s: &str) -> Result<u8> {
    let trimmed = s.trim();
    let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let value: u8 = digits
        .parse()
        .map_err(|_| Error::Configuration(format!("'{s}' is not a percentage")))?;
    check_percent("percentage", value)?;
    Ok(value)
}

fn check_rotation(name: &str, degrees: f32) -> Result<()> {
    if !degrees.is_finite() {
        return Err(Error::Configuration(format!(
            "{name} {degrees} is not a number of degrees"
        )));
    }
    Ok(())
}

fn check_percent(name: &str, value: u8) -> Result<()> {
    if value > 100 {
        return Err(Error::Configuration(format!(
            "{name} {value} exceeds 100"
        )));
    }
    Ok(())
}
