use chromatrace::ChromatraceResult;

use crate::cli::{ConvertCommand, GlobalOptions};

use super::utils::{build_vectorizer, sibling_output};

/// The main function to run the convert command.
pub fn run(global: &GlobalOptions, cmd: ConvertCommand) -> ChromatraceResult<()> {
    let vectorizer = build_vectorizer(global);
    let output_path = cmd
        .output
        .clone()
        .unwrap_or_else(|| sibling_output(&cmd.input, None, "svg"));

    let report = vectorizer.convert(&cmd.input, &output_path)?;
    let (w, h) = report.dimensions;
    println!(
        "SVG saved to {} ({w}x{h}, {} paths, {} colors)",
        report.output.display(),
        report.path_count,
        report.palette.len()
    );

    Ok(())
}
