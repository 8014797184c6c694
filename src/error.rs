//! Error types for the photo-watermark crate.

use std::path::PathBuf;

/// Errors that can occur while rendering or exporting watermarked images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A base image or watermark image could not be read or decoded.
    #[error("cannot read image {}: {source}", path.display())]
    FileAccess {
        /// Path of the file that failed to load.
        path: PathBuf,
        /// Underlying decoder or I/O error.
        source: image::ImageError,
    },

    /// A font file could not be loaded or parsed.
    #[error("font resolution failed: {0}")]
    FontResolution(String),

    /// A configuration value is out of range or could not be parsed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An I/O error occurred while writing output files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while encoding an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
