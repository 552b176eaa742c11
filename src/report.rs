use chromatrace::ChromatraceError;

pub fn report_error(err: &ChromatraceError) {
    eprintln!("{err}");
    match err {
        ChromatraceError::Clustering { distinct, .. } if *distinct > 0 => {
            eprintln!();
            eprintln!("Try a smaller palette:");
            eprintln!("  - Use --colors <N> with N between 1 and {distinct}");
            eprintln!(
                "  - Or set environment variable {} accordingly",
                chromatrace::ENV_COLORS
            );
        }
        ChromatraceError::InvalidBlurSigma { max, .. } => {
            eprintln!();
            eprintln!("Pass --blur-sigma with a value in (0, {max}], or omit it to skip smoothing.");
        }
        ChromatraceError::Trace { .. } | ChromatraceError::LabelOutOfRange { .. } => {
            eprintln!();
            eprintln!("This is a bug; please report it along with the input image.");
        }
        _ => {}
    }
}
