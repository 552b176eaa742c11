//! SVG document assembly and output.
//!
//! Every traced boundary becomes one filled `<path>` with no stroke. Paths
//! are written in insertion order, so later clusters paint over earlier ones.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use image::Rgb;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::SvgOptions;
use crate::tracer::Boundary;
use crate::{ChromatraceError, ChromatraceResult};

/// A filled, unstroked closed path.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    pub boundary: Boundary,
    pub fill: Rgb<u8>,
}

impl VectorPath {
    pub fn new(boundary: Boundary, fill: Rgb<u8>) -> Self {
        Self { boundary, fill }
    }

    /// Path data: a move to the first point, a line to every following point, then close.
    pub fn data(&self, precision: usize) -> String {
        let mut d = String::new();
        for (i, p) in self.boundary.points().iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            let _ = write!(d, "{cmd} {:.prec$},{:.prec$}", p.x, p.y, prec = precision);
        }
        if !d.is_empty() {
            d.push_str(" Z");
        }
        d
    }
}

/// Format a color as `#rrggbb`.
pub fn hex_color(color: Rgb<u8>) -> String {
    let [r, g, b] = color.0;
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// The output document: a fixed-size canvas and its stacked paths.
#[derive(Debug, Clone, Default)]
pub struct SvgDocument {
    width: u32,
    height: u32,
    paths: Vec<VectorPath>,
    options: SvgOptions,
}

impl SvgDocument {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            paths: Vec::new(),
            options: SvgOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SvgOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn paths(&self) -> &[VectorPath] {
        &self.paths
    }

    pub fn push(&mut self, path: VectorPath) {
        self.paths.push(path);
    }

    /// Add one path per boundary, all filled with `fill`.
    pub fn extend_region(&mut self, boundaries: Vec<Boundary>, fill: Rgb<u8>) {
        self.paths
            .extend(boundaries.into_iter().map(|b| VectorPath::new(b, fill)));
    }

    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, r#"<?xml version="1.0" encoding="utf-8" ?>"#);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" baseProfile="full" version="1.1" width="{w}" height="{h}">"#,
            w = self.width,
            h = self.height,
        );
        for path in &self.paths {
            let _ = writeln!(
                out,
                r#"  <path d="{}" fill="{}" stroke="none"/>"#,
                path.data(self.options.precision),
                hex_color(path.fill),
            );
        }
        out.push_str("</svg>\n");
        out
    }

    /// Write the document to `path`.
    ///
    /// The document is written to a temporary file next to `path` and moved into
    /// place only once complete, so a failed save never leaves a partial file.
    pub fn save(&self, path: impl AsRef<Path>) -> ChromatraceResult<()> {
        let path = path.as_ref();
        let serialization = |source| ChromatraceError::Serialization {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(serialization)?;
        file.write_all(self.to_svg_string().as_bytes())
            .map_err(serialization)?;
        file.flush().map_err(serialization)?;
        file.persist(path).map_err(|e| serialization(e.error))?;

        debug!(path = %path.display(), paths = self.paths.len(), "wrote svg");
        Ok(())
    }
}
