use chromatrace::ChromatraceResult;

use crate::cli::{GlobalOptions, PosterizeCommand};

use super::utils::{build_vectorizer, sibling_output};

/// The main function to run the posterize command.
pub fn run(global: &GlobalOptions, cmd: PosterizeCommand) -> ChromatraceResult<()> {
    let vectorizer = build_vectorizer(global);
    let output_path = cmd
        .output
        .clone()
        .unwrap_or_else(|| sibling_output(&cmd.input, Some("posterized"), "png"));

    let quantization = vectorizer.quantize_image(&cmd.input)?;
    quantization.to_image().save(&output_path)?;
    println!("Posterized PNG saved to {}", output_path.display());

    Ok(())
}
