//! PDF engines.
//!
//! `PdfEngine` is the seam between the pipeline and whatever turns the styled
//! document into PDF bytes. `LayoutEngine` (built in, deterministic) is the
//! default; `ChromeEngine` prints the HTML intermediate with a headless
//! browser. The renderer holds a `Box<dyn PdfEngine>` chosen at startup.

pub mod chrome;
pub mod writer;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::errors::RenderError;
use crate::layout::{layout_document, Layout};
use crate::markdown::Document;
use crate::style::{StyleResolver, StyleSheet};

pub use chrome::ChromeEngine;

/// Everything an engine may need: the parsed document for engines that lay
/// out natively, the composed HTML page for engines that print HTML.
pub struct EngineInput<'a> {
    pub document: &'a Document,
    pub html: &'a str,
    pub styles: &'a StyleSheet,
}

pub trait PdfEngine: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    fn render(&self, input: &EngineInput<'_>) -> Result<Vec<u8>, RenderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LayoutEngine
// ────────────────────────────────────────────────────────────────────────────

/// Built-in engine: cascade, line breaking and pagination in-process, output
/// written with base-14 fonts. Needs no external programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine;

impl LayoutEngine {
    pub fn layout(&self, input: &EngineInput<'_>) -> Result<Layout, RenderError> {
        let resolver = StyleResolver::new(input.styles)?;
        layout_document(input.document, &resolver)
    }
}

impl PdfEngine for LayoutEngine {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn render(&self, input: &EngineInput<'_>) -> Result<Vec<u8>, RenderError> {
        let layout = self.layout(input)?;
        debug!(
            pages = layout.pages.len(),
            fonts = layout.faces().len(),
            "Layout complete"
        );
        writer::write_pdf(&layout, input.document.title().as_deref())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Layout,
    Chrome,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "layout" | "builtin" => Ok(EngineKind::Layout),
            "chrome" | "chromium" => Ok(EngineKind::Chrome),
            other => Err(format!("unknown PDF engine '{other}' (expected layout or chrome)")),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Layout => "layout",
            EngineKind::Chrome => "chrome",
        })
    }
}

pub fn build_engine(
    kind: EngineKind,
    chrome_path: Option<&Path>,
) -> Result<Box<dyn PdfEngine>, RenderError> {
    Ok(match kind {
        EngineKind::Layout => Box::new(LayoutEngine),
        EngineKind::Chrome => Box::new(ChromeEngine::discover(chrome_path)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::html::render_page;

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!("layout".parse::<EngineKind>(), Ok(EngineKind::Layout));
        assert_eq!(" Chrome ".parse::<EngineKind>(), Ok(EngineKind::Chrome));
        assert!("weasyprint".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::default().to_string(), "layout");
    }

    #[test]
    fn test_layout_engine_renders_pdf_bytes() {
        let document = Document::parse("# Title\n\nBody text.");
        let styles = StyleSheet::resume();
        let html = render_page(&document, &styles);
        let input = EngineInput {
            document: &document,
            html: &html,
            styles: &styles,
        };
        let bytes = LayoutEngine.render(&input).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(build_engine(EngineKind::Layout, None).unwrap().name(), "layout");
    }

    #[test]
    fn test_layout_engine_reports_bad_styles() {
        let document = Document::parse("text");
        let styles = StyleSheet::new().with_rule("body", &[("font-family", "Calibri")]);
        let input = EngineInput {
            document: &document,
            html: "",
            styles: &styles,
        };
        let err = LayoutEngine.render(&input).unwrap_err();
        assert!(matches!(err, RenderError::UnresolvedFont(_)), "got {err:?}");
    }
}
