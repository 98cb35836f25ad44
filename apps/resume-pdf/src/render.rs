//! The render pipeline: Markdown → HTML page → PDF bytes → file.

use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::RenderError;
use crate::markdown::{html, Document};
use crate::pdf::{EngineInput, PdfEngine};
use crate::style::StyleSheet;

/// Outcome of a successful render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    pub output: PathBuf,
    pub bytes: usize,
    pub pages: usize,
    pub engine: String,
}

pub struct Renderer {
    styles: StyleSheet,
    engine: Box<dyn PdfEngine>,
    output: PathBuf,
    html_output: Option<PathBuf>,
}

impl Renderer {
    pub fn new(styles: StyleSheet, engine: Box<dyn PdfEngine>, output: impl Into<PathBuf>) -> Self {
        Renderer {
            styles,
            engine,
            output: output.into(),
            html_output: None,
        }
    }

    /// Also writes the composed HTML page to `path`.
    pub fn with_html_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.html_output = Some(path.into());
        self
    }

    #[cfg(test)]
    pub fn render(&self, markdown: &str) -> Result<RenderReport, RenderError> {
        self.render_document(&Document::parse(markdown))
    }

    /// Renders `document` and replaces the output file. On any error the
    /// previous output file, if there was one, is left untouched.
    pub fn render_document(&self, document: &Document) -> Result<RenderReport, RenderError> {
        let page = html::render_page(document, &self.styles);
        let input = EngineInput {
            document,
            html: &page,
            styles: &self.styles,
        };
        let bytes = self.engine.render(&input)?;
        if bytes.is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        let pages = count_pages(&bytes)?;

        write_atomic(&self.output, &bytes)?;
        // Only after the PDF is in place, so a failed run touches neither file.
        if let Some(path) = &self.html_output {
            write_atomic(path, page.as_bytes())?;
            debug!("Wrote HTML intermediate to {}", path.display());
        }
        info!(
            engine = self.engine.name(),
            pages,
            bytes = bytes.len(),
            "Wrote {}",
            self.output.display()
        );

        Ok(RenderReport {
            output: self.output.clone(),
            bytes: bytes.len(),
            pages,
            engine: self.engine.name().to_string(),
        })
    }
}

fn count_pages(bytes: &[u8]) -> Result<usize, RenderError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| RenderError::Engine(format!("engine output is not a readable PDF: {e}")))?;
    Ok(doc.get_pages().len())
}

/// Writes `bytes` to a temporary file beside `path`, then renames it over
/// `path`. The replacement keeps the permissions of the file it replaces.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| RenderError::io(path, e))?;
    if let Some(permissions) = target_permissions(path) {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| RenderError::io(path, e))?;
    }
    tmp.write_all(bytes).map_err(|e| RenderError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| RenderError::io(path, e))?;
    tmp.persist(path).map_err(|e| RenderError::io(path, e.error))?;
    Ok(())
}

/// The existing target's permissions, or `0644` for a new file. Temporary
/// files are created owner-only.
fn target_permissions(path: &Path) -> Option<Permissions> {
    match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
