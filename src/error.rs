use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for operations that may fail with [`ChromatraceError`].
pub type ChromatraceResult<T> = std::result::Result<T, ChromatraceError>;

/// Error types that can occur while turning a raster image into an SVG.
///
/// Every pipeline stage fails fast with one of these variants and the first
/// error is propagated unchanged to the caller.
#[derive(Debug, Error)]
pub enum ChromatraceError {
    /// The source image is missing, unreadable, or not a decodable image.
    #[error("Failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The smoothing sigma is not finite or exceeds [`crate::MAX_BLUR_SIGMA`].
    #[error("Invalid blur sigma {sigma}: expected a finite value no greater than {max}")]
    InvalidBlurSigma { sigma: f32, max: f32 },
    /// The requested color count cannot be satisfied by the image content.
    #[error(
        "Cannot cluster into {requested} colors: the image has {distinct} distinct colors (need 1..={distinct})"
    )]
    Clustering { requested: usize, distinct: usize },
    /// A mask handed to the tracer does not match the label grid it came from.
    #[error("Mask size {found:?} does not match label grid size {expected:?}")]
    Trace {
        expected: (u32, u32),
        found: (u32, u32),
    },
    /// The destination document could not be written.
    #[error("Failed to write SVG to {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A cluster index outside the palette was requested.
    #[error("Cluster index {index} is out of range for a palette of {n_colors} colors")]
    LabelOutOfRange { index: usize, n_colors: usize },
    /// Image encoding error when exporting raster artefacts.
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
    /// File system I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
