use std::path::Path;

use image::{DynamicImage, ImageError, ImageReader, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use crate::config::LoadOptions;
use crate::{ChromatraceError, ChromatraceResult};

/// Decode an image file into an RGB pixel grid, downsampled to fit the configured cap.
pub fn load_image(path: &Path, options: &LoadOptions) -> ChromatraceResult<RgbImage> {
    let blur_sigma = options.effective_blur_sigma()?;
    let decoded = decode(path).map_err(|source| ChromatraceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded source image"
    );

    let rgb = normalize_to_rgb(decoded);
    let rgb = downsample(rgb, options);
    Ok(match blur_sigma {
        Some(sigma) => gaussian_blur_f32(&rgb, sigma),
        None => rgb,
    })
}

fn decode(path: &Path) -> Result<DynamicImage, ImageError> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Convert any decoded layout into 8-bit RGB.
///
/// Grayscale is replicated into all three channels, alpha is dropped and
/// deeper sample types are scaled down to `u8`.
pub fn normalize_to_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.into_rgb8(),
    }
}

/// Downsample `rgb` so that neither side exceeds `options.max_dimension`.
pub fn downsample(rgb: RgbImage, options: &LoadOptions) -> RgbImage {
    let (w, h) = rgb.dimensions();
    match fit_within(w, h, options.max_dimension) {
        Some((new_w, new_h)) => {
            debug!(from = ?(w, h), to = ?(new_w, new_h), "downsampling");
            image::imageops::resize(&rgb, new_w, new_h, options.resize_filter)
        }
        None => rgb,
    }
}

/// Compute the downsampled size for a `width`×`height` image, or `None` when it already fits.
///
/// Each side becomes `floor(side * cap / max(width, height))`, never dropping
/// below one pixel. The longest side lands exactly on `cap`.
pub fn fit_within(width: u32, height: u32, cap: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if cap == 0 || longest <= cap {
        return None;
    }
    let scaled = |side: u32| {
        let side = u64::from(side) * u64::from(cap) / u64::from(longest);
        (side as u32).clamp(1, cap)
    };
    Some((scaled(width), scaled(height)))
}
