use image::imageops::FilterType;

use crate::{ChromatraceError, ChromatraceResult};

/// Number of palette colors used when none is specified.
pub const DEFAULT_N_COLORS: usize = 10;
/// Longest allowed side of the working image, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 512;
/// Seed for the k-means++ initialization.
pub const DEFAULT_SEED: u64 = 42;
/// Upper bound on Lloyd iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
/// Relative convergence tolerance, scaled by the mean channel variance.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
/// Decimal places written for path coordinates.
pub const DEFAULT_PRECISION: usize = 2;
/// Largest accepted Gaussian smoothing sigma.
pub const MAX_BLUR_SIGMA: f32 = 128.0;
/// Environment variable consulted by the CLI for the color count.
pub const ENV_COLORS: &str = "CHROMATRACE_COLORS";

/// Options for decoding and normalizing the source image.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Images whose width or height exceeds this value are downsampled to fit.
    pub max_dimension: u32,
    /// Filter used when downsampling.
    pub resize_filter: FilterType,
    /// Optional Gaussian smoothing applied after resizing.
    pub blur_sigma: Option<f32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            resize_filter: FilterType::Triangle,
            blur_sigma: None,
        }
    }
}

impl LoadOptions {
    /// Set the downsample cap.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Set the resize filter.
    pub fn with_resize_filter(mut self, filter: FilterType) -> Self {
        self.resize_filter = filter;
        self
    }

    /// Set the optional smoothing sigma. Non-positive values disable smoothing.
    ///
    /// Non-finite values and values above [`MAX_BLUR_SIGMA`] are rejected by
    /// [`LoadOptions::effective_blur_sigma`] when the image is loaded.
    pub fn with_blur_sigma(mut self, sigma: Option<f32>) -> Self {
        self.blur_sigma = sigma;
        self
    }

    /// The sigma that will actually be applied, or `None` when smoothing is off.
    pub fn effective_blur_sigma(&self) -> ChromatraceResult<Option<f32>> {
        match self.blur_sigma {
            Some(sigma) if !sigma.is_finite() || sigma > MAX_BLUR_SIGMA => {
                Err(ChromatraceError::InvalidBlurSigma {
                    sigma,
                    max: MAX_BLUR_SIGMA,
                })
            }
            Some(sigma) if sigma > 0.0 => Ok(Some(sigma)),
            _ => Ok(None),
        }
    }
}

/// Options for the k-means color quantizer.
#[derive(Debug, Clone)]
pub struct QuantizeOptions {
    pub n_colors: usize,
    pub seed: u64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            n_colors: DEFAULT_N_COLORS,
            seed: DEFAULT_SEED,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl QuantizeOptions {
    /// Create options for the given color count with default tuning.
    pub fn new(n_colors: usize) -> Self {
        Self {
            n_colors,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Options for writing the SVG document.
#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Decimal places for path coordinates.
    pub precision: usize,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}
