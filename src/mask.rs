use image::{GrayImage, Luma};

use crate::quantize::LabelGrid;
use crate::{ChromatraceError, ChromatraceResult};

/// Value written for pixels that belong to the cluster.
pub const MASK_SET: u8 = 255;

/// Build the binary mask of one cluster: 255 where the label equals `index`, 0 elsewhere.
pub fn region_mask(labels: &LabelGrid, index: usize) -> ChromatraceResult<GrayImage> {
    let n_colors = labels.n_colors();
    if index >= n_colors {
        return Err(ChromatraceError::LabelOutOfRange { index, n_colors });
    }

    let (w, h) = labels.dimensions();
    let grid = labels.as_array();
    let mut mask = GrayImage::new(w, h);
    for (x, y, px) in mask.enumerate_pixels_mut() {
        if grid[[y as usize, x as usize]] as usize == index {
            *px = Luma([MASK_SET]);
        }
    }
    Ok(mask)
}

/// Masks for every cluster, in cluster order.
pub fn region_masks(labels: &LabelGrid) -> impl Iterator<Item = (usize, GrayImage)> + '_ {
    (0..labels.n_colors()).filter_map(move |index| {
        region_mask(labels, index).ok().map(|mask| (index, mask))
    })
}

/// Number of set pixels in a mask.
pub fn mask_coverage(mask: &GrayImage) -> usize {
    mask.pixels().filter(|px| px[0] > MASK_SET / 2).count()
}
