pub mod config;
pub mod error;
pub mod loader;
pub mod mask;
pub mod quantize;
pub mod svg;
pub mod tracer;

pub use config::{
    DEFAULT_MAX_DIMENSION, DEFAULT_MAX_ITERATIONS, DEFAULT_N_COLORS, DEFAULT_PRECISION,
    DEFAULT_SEED, DEFAULT_TOLERANCE, ENV_COLORS, LoadOptions, MAX_BLUR_SIGMA, QuantizeOptions, SvgOptions,
};
pub use error::{ChromatraceError, ChromatraceResult};
pub use quantize::{LabelGrid, Palette, Quantization};
pub use svg::{SvgDocument, VectorPath, hex_color};
pub use tracer::{Boundary, BoundaryTracer, MarchingSquares, Point};

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use tracing::{debug, info};

use crate::loader::load_image;
use crate::mask::region_mask;
use crate::quantize::quantize;

/// Convert the image at `input` into an SVG at `output` using `n_colors` palette colors.
///
/// Uses the default downsample cap, seed and precision. Nothing is written on failure.
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    n_colors: usize,
) -> ChromatraceResult<ConversionReport> {
    Vectorizer::new()
        .with_colors(n_colors)
        .convert(input, output)
}

/// Entry point for configuring and running the raster-to-vector pipeline.
#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    load: LoadOptions,
    quantize: QuantizeOptions,
    svg: SvgOptions,
    tracer: MarchingSquares,
}

impl Vectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of palette colors.
    pub fn with_colors(mut self, n_colors: usize) -> Self {
        self.quantize.n_colors = n_colors;
        self
    }

    /// Set the longest side allowed before the input is downsampled.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.load.max_dimension = max_dimension;
        self
    }

    /// Set the filter used when downsampling.
    pub fn with_resize_filter(mut self, filter: FilterType) -> Self {
        self.load.resize_filter = filter;
        self
    }

    /// Smooth the working image before quantization.
    pub fn with_blur_sigma(mut self, sigma: Option<f32>) -> Self {
        self.load.blur_sigma = sigma;
        self
    }

    /// Set the seed of the k-means++ initialization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.quantize.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.quantize.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.quantize.tolerance = tolerance;
        self
    }

    /// Set the number of decimals written for path coordinates.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.svg.precision = precision;
        self
    }

    /// Load and quantize a single image.
    pub fn quantize_image(&self, image_path: impl AsRef<Path>) -> ChromatraceResult<Quantization> {
        let rgb = load_image(image_path.as_ref(), &self.load)?;
        quantize(&rgb, &self.quantize)
    }

    /// Run the full pipeline for a single image, keeping the result in memory.
    pub fn vectorize(&self, image_path: impl AsRef<Path>) -> ChromatraceResult<VectorizedImage> {
        let quantization = self.quantize_image(image_path)?;
        self.vectorize_quantized(quantization)
    }

    /// Trace every cluster of an existing quantization into a document.
    pub fn vectorize_quantized(
        &self,
        quantization: Quantization,
    ) -> ChromatraceResult<VectorizedImage> {
        let (width, height) = quantization.labels.dimensions();
        let mut document = SvgDocument::new(width, height).with_options(self.svg.clone());
        let mut paths_per_cluster = Vec::with_capacity(quantization.palette.len());

        for (index, color) in quantization.palette.iter().enumerate() {
            let boundaries = trace_cluster(&self.tracer, &quantization.labels, index)?;
            debug!(
                cluster = index,
                color = %hex_color(color),
                boundaries = boundaries.len(),
                "traced cluster"
            );
            paths_per_cluster.push(boundaries.len());
            document.extend_region(boundaries, color);
        }

        Ok(VectorizedImage {
            document,
            palette: quantization.palette,
            paths_per_cluster,
        })
    }

    /// Run the pipeline and write the SVG to `output`.
    pub fn convert(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> ChromatraceResult<ConversionReport> {
        let vectorized = self.vectorize(input)?;
        let output = output.as_ref();
        vectorized.save(output)?;

        let report = ConversionReport {
            output: output.to_path_buf(),
            dimensions: vectorized.document.dimensions(),
            path_count: vectorized.document.paths().len(),
            palette: vectorized.palette,
        };
        info!(
            output = %report.output.display(),
            width = report.dimensions.0,
            height = report.dimensions.1,
            paths = report.path_count,
            "conversion finished"
        );
        Ok(report)
    }
}

/// Build the mask for cluster `index` and trace it.
pub fn trace_cluster<T>(
    tracer: &T,
    labels: &LabelGrid,
    index: usize,
) -> ChromatraceResult<Vec<Boundary>>
where
    T: BoundaryTracer,
{
    let mask = region_mask(labels, index)?;
    tracer.trace_checked(&mask, labels.dimensions())
}

/// The traced document for one image, before it is written anywhere.
#[derive(Debug, Clone)]
pub struct VectorizedImage {
    document: SvgDocument,
    palette: Palette,
    paths_per_cluster: Vec<usize>,
}

impl VectorizedImage {
    pub fn document(&self) -> &SvgDocument {
        &self.document
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Number of paths contributed by each cluster, in palette order.
    pub fn paths_per_cluster(&self) -> &[usize] {
        &self.paths_per_cluster
    }

    pub fn to_svg_string(&self) -> String {
        self.document.to_svg_string()
    }

    /// Save the SVG to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> ChromatraceResult<()> {
        self.document.save(path)
    }
}

/// Summary of a finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub dimensions: (u32, u32),
    pub path_count: usize,
    pub palette: Palette,
}
