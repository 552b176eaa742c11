use std::path::{Path, PathBuf};

use chromatrace::Vectorizer;

use crate::cli::GlobalOptions;

pub fn build_vectorizer(global: &GlobalOptions) -> Vectorizer {
    Vectorizer::new()
        .with_colors(global.colors)
        .with_max_dimension(global.max_dimension)
        .with_resize_filter(global.resize_filter.filter_type())
        .with_blur_sigma(global.blur_sigma)
        .with_seed(global.seed)
        .with_max_iterations(global.max_iterations)
        .with_precision(global.precision)
}

/// Output path next to `input`: `<stem>.<extension>`, or `<stem>-<tag>.<extension>`
/// when a tag is given.
pub fn sibling_output(input: &Path, tag: Option<&str>, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match tag {
        Some(tag) => format!("{stem}-{tag}.{extension}"),
        None => format!("{stem}.{extension}"),
    };
    input.with_file_name(name)
}
