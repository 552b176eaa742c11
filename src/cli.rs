use std::path::PathBuf;

use chromatrace::{
    DEFAULT_MAX_DIMENSION, DEFAULT_MAX_ITERATIONS, DEFAULT_N_COLORS, DEFAULT_PRECISION,
    DEFAULT_SEED, ENV_COLORS, MAX_BLUR_SIGMA,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::imageops::FilterType;

/// Command line interface definition.
#[derive(Parser, Debug)]
#[command(author, version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOptions {
    /// Number of palette colors
    #[arg(short = 'c', long, global = true, env = ENV_COLORS, default_value_t = DEFAULT_N_COLORS, value_parser = parse_color_count)]
    pub colors: usize,
    /// Downsample so that neither side exceeds this many pixels
    #[arg(long = "max-dimension", global = true, default_value_t = DEFAULT_MAX_DIMENSION)]
    pub max_dimension: u32,
    /// Filter used when downsampling the input
    #[arg(long = "resize-filter", global = true, value_enum, default_value_t = DownsampleFilter::Bilinear)]
    pub resize_filter: DownsampleFilter,
    /// Gaussian blur sigma applied before quantization
    #[arg(long = "blur-sigma", global = true, value_parser = parse_sigma)]
    pub blur_sigma: Option<f32>,
    /// Seed for the k-means initialization
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
    /// Maximum k-means iterations
    #[arg(long = "max-iterations", global = true, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
    /// Decimal places for SVG path coordinates
    #[arg(long, global = true, default_value_t = DEFAULT_PRECISION)]
    pub precision: usize,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Vectorize an image into a color SVG
    Convert(ConvertCommand),
    /// Export the color-quantized image as a PNG
    Posterize(PosterizeCommand),
    /// Print the quantized palette
    Palette(PaletteCommand),
}

/// Filters offered for shrinking oversized inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DownsampleFilter {
    /// Nearest neighbor; keeps hard color edges, adds no new colors.
    Nearest,
    /// Bilinear (`image`'s triangle filter).
    #[value(alias = "triangle")]
    Bilinear,
    Bicubic,
    Lanczos,
}

impl DownsampleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Lanczos => FilterType::Lanczos3,
        }
    }
}

#[derive(Args, Debug)]
pub struct ConvertCommand {
    /// Input image path
    pub input: PathBuf,
    /// Output SVG path (defaults to input name with `.svg`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PosterizeCommand {
    /// Input image path
    pub input: PathBuf,
    /// Output PNG path (defaults to `<name>-posterized.png`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PaletteCommand {
    /// Input image path
    pub input: PathBuf,
}

fn parse_color_count(value: &str) -> Result<usize, String> {
    let count = value
        .parse::<usize>()
        .map_err(|_| format!("color count must be a positive integer, got `{value}`"))?;
    if count == 0 {
        return Err("color count must be at least 1".to_string());
    }
    Ok(count)
}

fn parse_sigma(value: &str) -> Result<f32, String> {
    let sigma = value
        .parse::<f32>()
        .map_err(|_| format!("blur sigma must be numeric, got `{value}`"))?;
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(format!("blur sigma must be positive, got {value}"));
    }
    if sigma > MAX_BLUR_SIGMA {
        return Err(format!("blur sigma must be at most {MAX_BLUR_SIGMA}, got {value}"));
    }
    Ok(sigma)
}
