//! Font handles for the text renderer.
//!
//! A [`WatermarkFont`] is either the embedded DejaVu Sans face or a font
//! loaded from disk. Picking *which* font is the caller's business; this
//! module only loads what it is given and falls back to the embedded face
//! when nothing else is usable.

use std::fmt;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale};

use crate::error::{Error, Result};

/// Embedded DejaVu Sans (Bitstream Vera derived, freely redistributable).
const BUNDLED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");

/// A parsed, shareable font.
#[derive(Clone)]
pub struct WatermarkFont {
    font: FontArc,
    name: String,
}

impl fmt::Debug for WatermarkFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkFont")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl WatermarkFont {
    /// The embedded default font.
    ///
    /// # Panics
    ///
    /// Panics if the embedded font data is corrupt (a build problem, never a
    /// runtime condition).
    #[must_use]
    pub fn bundled() -> Self {
        let font = FontArc::try_from_slice(BUNDLED_FONT_DATA)
            .expect("embedded DejaVu Sans must parse");
        Self {
            font,
            name: "DejaVu Sans (bundled)".to_string(),
        }
    }

    /// Load a TrueType/OpenType font from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FontResolution`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            Error::FontResolution(format!("cannot read {}: {e}", path.display()))
        })?;
        let font = FontArc::try_from_vec(data).map_err(|e| {
            Error::FontResolution(format!("cannot parse {}: {e}", path.display()))
        })?;
        Ok(Self {
            font,
            name: path.display().to_string(),
        })
    }

    /// First candidate that loads, otherwise the bundled font.
    #[must_use]
    pub fn resolve<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.is_file() {
                continue;
            }
            match Self::from_path(path) {
                Ok(font) => {
                    log::debug!("using font {}", path.display());
                    return font;
                }
                Err(e) => log::warn!("skipping font candidate: {e}"),
            }
        }
        log::warn!("no usable font among {} candidates, using bundled DejaVu Sans", candidates.len());
        Self::bundled()
    }

    /// Human-readable origin of the font.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn inner(&self) -> &FontArc {
        &self.font
    }

    /// Scale for an em size of `px` pixels.
    ///
    /// ab_glyph scales by ascent-to-descent height; TrueType sizes are em
    /// sizes, so convert through `units_per_em`.
    #[must_use]
    pub fn px_scale(&self, px: f32) -> PxScale {
        match self.font.units_per_em() {
            Some(upem) if upem > 0.0 => PxScale::from(px * self.font.height_unscaled() / upem),
            _ => PxScale::from(px),
        }
    }
}

impl Default for WatermarkFont {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Common system font locations, most preferred first.
#[must_use]
pub fn system_font_candidates() -> Vec<PathBuf> {
    [
        "C:/Windows/Fonts/simhei.ttf",
        "C:/Windows/Fonts/msyh.ttc",
        "C:/Windows/Fonts/arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Helvetica.ttc",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}
