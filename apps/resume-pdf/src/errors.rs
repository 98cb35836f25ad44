use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure of any stage of the render pipeline.
///
/// Nothing in the pipeline catches or retries these; they propagate to `main`,
/// which reports them and exits non-zero.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Markdown conversion failed: {0}")]
    Conversion(String),

    #[error("No font in '{0}' resolves to an available PDF font")]
    UnresolvedFont(String),

    #[error("Invalid style for '{selector}': {detail}")]
    InvalidStyle { selector: String, detail: String },

    #[error("PDF engine error: {0}")]
    Engine(String),

    #[error("PDF engine produced no output")]
    EmptyOutput,

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse failure classes reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Markdown could not be mapped to HTML.
    Conversion,
    /// The layout engine could not produce a PDF from the HTML/CSS.
    Render,
    /// A file could not be read or written.
    Io,
}

impl RenderError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid_style(selector: &str, detail: impl Into<String>) -> Self {
        RenderError::InvalidStyle {
            selector: selector.to_string(),
            detail: detail.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            RenderError::Conversion(_) => ErrorClass::Conversion,
            RenderError::UnresolvedFont(_)
            | RenderError::InvalidStyle { .. }
            | RenderError::Engine(_)
            | RenderError::EmptyOutput => ErrorClass::Render,
            RenderError::Io { .. } => ErrorClass::Io,
        }
    }
}

impl From<lopdf::Error> for RenderError {
    fn from(e: lopdf::Error) -> Self {
        RenderError::Engine(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            RenderError::Conversion("bad".into()).class(),
            ErrorClass::Conversion
        );
        assert_eq!(
            RenderError::UnresolvedFont("Calibri".into()).class(),
            ErrorClass::Render
        );
        assert_eq!(RenderError::EmptyOutput.class(), ErrorClass::Render);
        let io = RenderError::io(
            "/nope/out.pdf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(io.class(), ErrorClass::Io);
    }

    #[test]
    fn test_io_error_message_names_path() {
        let err = RenderError::io(
            "out/demo.pdf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let msg = err.to_string();
        assert!(msg.contains("out/demo.pdf"), "got: {msg}");
        assert!(msg.contains("missing"), "got: {msg}");
    }

    #[test]
    fn test_invalid_style_message() {
        let err = RenderError::invalid_style("h1", "unknown color 'tealish'");
        assert_eq!(
            err.to_string(),
            "Invalid style for 'h1': unknown color 'tealish'"
        );
    }
}
