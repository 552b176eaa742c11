//! Seeded k-means color quantization.
//!
//! Pixels are collapsed into distinct colors with counts first, so Lloyd
//! iterations run over the (usually much smaller) weighted color set. The
//! distinct colors are sorted, which makes every run with the same seed
//! produce the same palette and labels.

use image::{Rgb, RgbImage};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::QuantizeOptions;
use crate::{ChromatraceError, ChromatraceResult};

/// The representative colors of a quantized image, in cluster index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
}

impl Palette {
    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<Rgb<u8>> {
        self.colors.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Rgb<u8>> + '_ {
        self.colors.iter().copied()
    }
}

/// Per-pixel cluster indices, shaped `(height, width)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    labels: Array2<u32>,
    n_colors: usize,
}

impl LabelGrid {
    /// Width and height, in image order.
    pub fn dimensions(&self) -> (u32, u32) {
        let (h, w) = self.labels.dim();
        (w as u32, h as u32)
    }

    pub fn n_colors(&self) -> usize {
        self.n_colors
    }

    /// Label of the pixel at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> Option<usize> {
        self.labels
            .get([y as usize, x as usize])
            .map(|&label| label as usize)
    }

    pub fn as_array(&self) -> &Array2<u32> {
        &self.labels
    }
}

/// Output of [`quantize`].
#[derive(Debug, Clone)]
pub struct Quantization {
    pub palette: Palette,
    pub labels: LabelGrid,
    /// Lloyd iterations actually run.
    pub iterations: usize,
    /// Pixel-weighted sum of squared distances to the unrounded centroids.
    pub inertia: f64,
}

impl Quantization {
    /// Paint every pixel with its cluster color.
    pub fn to_image(&self) -> RgbImage {
        let (w, h) = self.labels.dimensions();
        let colors = self.palette.colors();
        RgbImage::from_fn(w, h, |x, y| {
            colors[self.labels.labels[[y as usize, x as usize]] as usize]
        })
    }

    /// Number of pixels assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.palette.len()];
        for &label in self.labels.labels.iter() {
            sizes[label as usize] += 1;
        }
        sizes
    }
}

/// A distinct color and the number of pixels carrying it.
#[derive(Debug, Clone, Copy)]
struct WeightedColor {
    rgb: [u8; 3],
    count: u64,
}

impl WeightedColor {
    fn point(&self) -> [f64; 3] {
        self.rgb.map(f64::from)
    }
}

/// Cluster the pixels of `image` into `options.n_colors` colors.
///
/// Fails with [`ChromatraceError::Clustering`] if the color count is zero or
/// larger than the number of distinct colors in the image.
pub fn quantize(image: &RgbImage, options: &QuantizeOptions) -> ChromatraceResult<Quantization> {
    let colors = distinct_colors(image);
    let k = options.n_colors;
    if k == 0 || k > colors.len() {
        return Err(ChromatraceError::Clustering {
            requested: k,
            distinct: colors.len(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut centroids = init_plus_plus(&colors, k, &mut rng);
    let tolerance = options.tolerance * mean_variance(&colors);
    let mut assignments = vec![usize::MAX; colors.len()];

    let mut iterations = 0;
    while iterations < options.max_iterations {
        iterations += 1;
        let changed = assign(&colors, &centroids, &mut assignments);
        let updated = update_centroids(&colors, &assignments, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;
        if !changed || shift <= tolerance {
            break;
        }
    }

    // Labels always follow the final centroids.
    assign(&colors, &centroids, &mut assignments);
    let inertia = colors
        .iter()
        .zip(&assignments)
        .map(|(c, &a)| c.count as f64 * squared_distance(&c.point(), &centroids[a]))
        .sum();

    let palette = Palette {
        colors: centroids.iter().map(round_centroid).collect(),
    };
    let labels = label_pixels(image, &colors, &assignments, k);
    debug!(
        n_colors = k,
        distinct = colors.len(),
        iterations,
        inertia,
        "quantized image"
    );

    Ok(Quantization {
        palette,
        labels,
        iterations,
        inertia,
    })
}

/// Sorted distinct colors of `image` with their pixel counts.
fn distinct_colors(image: &RgbImage) -> Vec<WeightedColor> {
    let mut pixels: Vec<[u8; 3]> = image.pixels().map(|p| p.0).collect();
    pixels.sort_unstable();

    let mut colors: Vec<WeightedColor> = Vec::new();
    for rgb in pixels {
        match colors.last_mut() {
            Some(last) if last.rgb == rgb => last.count += 1,
            _ => colors.push(WeightedColor { rgb, count: 1 }),
        }
    }
    colors
}

/// k-means++ seeding, weighting every color by its pixel count.
fn init_plus_plus(colors: &[WeightedColor], k: usize, rng: &mut impl Rng) -> Vec<[f64; 3]> {
    let mut centroids = Vec::with_capacity(k);
    let counts: Vec<f64> = colors.iter().map(|c| c.count as f64).collect();
    let first = sample_weighted(&counts, rng);
    centroids.push(colors[first].point());

    let mut nearest: Vec<f64> = colors
        .iter()
        .map(|c| squared_distance(&c.point(), &centroids[0]))
        .collect();

    while centroids.len() < k {
        let weights: Vec<f64> = counts.iter().zip(&nearest).map(|(w, d)| w * d).collect();
        let next = sample_weighted(&weights, rng);
        let centroid = colors[next].point();
        for (d, c) in nearest.iter_mut().zip(colors) {
            *d = d.min(squared_distance(&c.point(), &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

/// Draw an index with probability proportional to `weights`.
///
/// Zero-weight entries are never drawn while any weight is positive.
fn sample_weighted(weights: &[f64], rng: &mut impl Rng) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let target = rng.random::<f64>() * total;
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        acc += w;
        last_positive = i;
        if target < acc {
            return i;
        }
    }
    last_positive
}

/// Assign every color to its nearest centroid; returns whether any assignment changed.
fn assign(colors: &[WeightedColor], centroids: &[[f64; 3]], assignments: &mut [usize]) -> bool {
    let mut changed = false;
    for (color, slot) in colors.iter().zip(assignments.iter_mut()) {
        let nearest = nearest_centroid(&color.point(), centroids);
        if *slot != nearest {
            *slot = nearest;
            changed = true;
        }
    }
    changed
}

/// Index of the closest centroid; ties go to the lowest index.
fn nearest_centroid(point: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

/// Weighted means of the assigned colors.
///
/// An empty cluster is moved onto the color lying farthest from its current centroid;
/// the next assignment pass picks it up.
fn update_centroids(
    colors: &[WeightedColor],
    assignments: &[usize],
    previous: &[[f64; 3]],
) -> Vec<[f64; 3]> {
    let k = previous.len();
    let mut sums = vec![[0.0f64; 3]; k];
    let mut weights = vec![0.0f64; k];
    for (color, &cluster) in colors.iter().zip(assignments) {
        let w = color.count as f64;
        let p = color.point();
        for c in 0..3 {
            sums[cluster][c] += p[c] * w;
        }
        weights[cluster] += w;
    }

    let mut centroids: Vec<[f64; 3]> = sums
        .iter()
        .zip(&weights)
        .zip(previous)
        .map(|((sum, &w), prev)| if w > 0.0 { sum.map(|s| s / w) } else { *prev })
        .collect();

    let mut taken = vec![false; colors.len()];
    for cluster in (0..k).filter(|&i| weights[i] == 0.0) {
        let farthest = colors
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken[*i])
            .map(|(i, c)| (i, squared_distance(&c.point(), &centroids[assignments[i]])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = farthest {
            taken[i] = true;
            centroids[cluster] = colors[i].point();
        }
    }
    centroids
}

fn label_pixels(
    image: &RgbImage,
    colors: &[WeightedColor],
    assignments: &[usize],
    n_colors: usize,
) -> LabelGrid {
    let (w, h) = image.dimensions();
    let mut labels = Array2::<u32>::zeros((h as usize, w as usize));
    for (x, y, px) in image.enumerate_pixels() {
        // Every pixel color is present in `colors` by construction.
        let idx = colors
            .binary_search_by(|c| c.rgb.cmp(&px.0))
            .unwrap_or_default();
        labels[[y as usize, x as usize]] = assignments[idx] as u32;
    }
    LabelGrid { labels, n_colors }
}

/// Mean of the per-channel pixel variances.
fn mean_variance(colors: &[WeightedColor]) -> f64 {
    let total: f64 = colors.iter().map(|c| c.count as f64).sum();
    let mut mean = [0.0f64; 3];
    for color in colors {
        let p = color.point();
        for c in 0..3 {
            mean[c] += p[c] * color.count as f64;
        }
    }
    let mean = mean.map(|m| m / total);
    let mut variance = 0.0;
    for color in colors {
        variance += color.count as f64 * squared_distance(&color.point(), &mean);
    }
    variance / total / 3.0
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Round half to even and clamp into the channel range.
fn round_centroid(centroid: &[f64; 3]) -> Rgb<u8> {
    Rgb(centroid.map(round_channel))
}

fn round_channel(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_ITERATIONS;

    fn checkerboard(size: u32, a: [u8; 3], b: [u8; 3]) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| if (x + y) % 2 == 0 { Rgb(a) } else { Rgb(b) })
    }

    mod unit {
        use super::*;

        #[test]
        fn zero_colors_is_rejected() {
            let img = checkerboard(4, [0, 0, 0], [255, 255, 255]);
            let err = quantize(&img, &QuantizeOptions::new(0)).unwrap_err();
            match err {
                ChromatraceError::Clustering {
                    requested,
                    distinct,
                } => {
                    assert_eq!(requested, 0);
                    assert_eq!(distinct, 2);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn more_colors_than_distinct_is_rejected() {
            let img = checkerboard(4, [0, 0, 0], [255, 255, 255]);
            let err = quantize(&img, &QuantizeOptions::new(3)).unwrap_err();
            assert!(matches!(
                err,
                ChromatraceError::Clustering {
                    requested: 3,
                    distinct: 2
                }
            ));
        }

        #[test]
        fn checkerboard_recovers_both_colors() {
            let a = [200, 30, 40];
            let b = [10, 90, 250];
            let img = checkerboard(4, a, b);
            let q = quantize(&img, &QuantizeOptions::new(2)).unwrap();

            let mut colors: Vec<[u8; 3]> = q.palette.iter().map(|c| c.0).collect();
            colors.sort();
            let mut expected = vec![a, b];
            expected.sort();
            assert_eq!(colors, expected);
            assert_eq!(q.inertia, 0.0);

            for (x, y, px) in img.enumerate_pixels() {
                let label = q.labels.get(x, y).unwrap();
                assert_eq!(q.palette.get(label).unwrap(), *px);
            }
        }

        #[test]
        fn exact_color_count_maps_each_color_to_itself() {
            let img = RgbImage::from_fn(3, 1, |x, _| Rgb([x as u8 * 100, 0, 0]));
            let q = quantize(&img, &QuantizeOptions::new(3)).unwrap();
            assert_eq!(q.to_image(), img);
        }

        #[test]
        fn two_blobs_are_separated() {
            let img = RgbImage::from_fn(10, 10, |x, y| {
                let jitter = ((x * 7 + y * 3) % 5) as u8;
                if x < 5 {
                    Rgb([10 + jitter, 10, 10])
                } else {
                    Rgb([240 - jitter, 240, 240])
                }
            });
            let q = quantize(&img, &QuantizeOptions::new(2)).unwrap();
            let left = q.labels.get(0, 0).unwrap();
            let right = q.labels.get(9, 9).unwrap();
            assert_ne!(left, right);
            for (x, y, _) in img.enumerate_pixels() {
                let expected = if x < 5 { left } else { right };
                assert_eq!(q.labels.get(x, y), Some(expected));
            }
            assert_eq!(q.cluster_sizes().iter().sum::<usize>(), 100);
        }

        #[test]
        fn iterations_respect_the_cap() {
            let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 77]));

            let capped = quantize(&img, &QuantizeOptions::new(4).with_max_iterations(1)).unwrap();
            assert_eq!(capped.iterations, 1);

            let full = quantize(&img, &QuantizeOptions::new(4)).unwrap();
            assert!((1..=DEFAULT_MAX_ITERATIONS).contains(&full.iterations));
            assert!(full.inertia <= capped.inertia);
        }

        #[test]
        fn centroid_rounding_is_half_to_even() {
            assert_eq!(round_channel(0.5), 0);
            assert_eq!(round_channel(1.5), 2);
            assert_eq!(round_channel(2.5), 2);
            assert_eq!(round_channel(2.4999), 2);
            assert_eq!(round_channel(254.5), 254);
            assert_eq!(round_channel(255.4), 255);
            assert_eq!(round_channel(-0.3), 0);
        }

        #[test]
        fn centroid_of_two_pixels_rounds_half_to_even() {
            // One cluster over channels {1, 2} -> mean 1.5 -> 2; {2, 3} -> 2.5 -> 2.
            let mut img = RgbImage::new(2, 1);
            img.put_pixel(0, 0, Rgb([1, 2, 0]));
            img.put_pixel(1, 0, Rgb([2, 3, 0]));
            let q = quantize(&img, &QuantizeOptions::new(1)).unwrap();
            assert_eq!(q.palette.get(0), Some(Rgb([2, 2, 0])));
        }

        #[test]
        fn sample_weighted_skips_zero_weights() {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            for _ in 0..100 {
                let i = sample_weighted(&[0.0, 3.0, 0.0, 1.0], &mut rng);
                assert!(i == 1 || i == 3);
            }
        }

        #[test]
        fn empty_cluster_is_reseeded_with_farthest_color() {
            let colors = [
                WeightedColor { rgb: [0, 0, 0], count: 1 },
                WeightedColor { rgb: [10, 0, 0], count: 1 },
                WeightedColor { rgb: [200, 0, 0], count: 1 },
            ];
            let previous = [[5.0, 0.0, 0.0], [100.0, 100.0, 100.0]];
            let assignments = [0, 0, 0];
            let updated = update_centroids(&colors, &assignments, &previous);
            assert_eq!(updated[1], [200.0, 0.0, 0.0]);
        }
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn small_image() -> impl Strategy<Value = RgbImage> {
            (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
                proptest::collection::vec(0u8..4, (w * h) as usize).prop_map(move |values| {
                    RgbImage::from_fn(w, h, |x, y| {
                        let v = values[(y * w + x) as usize];
                        Rgb([v * 60, 255 - v * 60, v * 20])
                    })
                })
            })
        }

        proptest! {
            /// quantize: same input and seed give identical palette and labels
            #[test]
            fn deterministic(img in small_image(), k in 1usize..4, seed in 0u64..1000) {
                let options = QuantizeOptions::new(k).with_seed(seed);
                match (quantize(&img, &options), quantize(&img, &options)) {
                    (Ok(a), Ok(b)) => {
                        prop_assert_eq!(a.palette, b.palette);
                        prop_assert_eq!(a.labels, b.labels);
                    }
                    (Err(_), Err(_)) => {}
                    _ => prop_assert!(false, "runs disagreed"),
                }
            }

            /// quantize: every label indexes into the palette
            #[test]
            fn labels_are_in_range(img in small_image(), k in 1usize..4) {
                if let Ok(q) = quantize(&img, &QuantizeOptions::new(k)) {
                    prop_assert_eq!(q.palette.len(), k);
                    prop_assert_eq!(q.labels.dimensions(), img.dimensions());
                    for &label in q.labels.as_array().iter() {
                        prop_assert!((label as usize) < k);
                    }
                }
            }
        }
    }
}
