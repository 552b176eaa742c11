use chromatrace::{ChromatraceResult, hex_color};

use crate::cli::{GlobalOptions, PaletteCommand};

use super::utils::build_vectorizer;

/// The main function to run the palette command.
pub fn run(global: &GlobalOptions, cmd: PaletteCommand) -> ChromatraceResult<()> {
    let vectorizer = build_vectorizer(global);
    let quantization = vectorizer.quantize_image(&cmd.input)?;
    let sizes = quantization.cluster_sizes();
    let total: usize = sizes.iter().sum();

    for (index, (color, size)) in quantization.palette.iter().zip(&sizes).enumerate() {
        let share = if total > 0 {
            *size as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        println!("{index:>3}  {}  {size:>8} px  {share:5.1}%", hex_color(color));
    }
    println!(
        "k-means: {} iterations, inertia {:.1}",
        quantization.iterations, quantization.inertia
    );

    Ok(())
}
