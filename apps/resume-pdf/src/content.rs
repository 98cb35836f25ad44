//! Content sources: where the Markdown to render comes from.

use std::path::PathBuf;

use tracing::debug;

use crate::errors::RenderError;
use crate::markdown::Document;

/// Built-in demo resume rendered when no input file is configured.
pub const SAMPLE_RESUME: &str = "\
# Sample Resume
**Sample Role** | Sample City, ST | Remote-Ready | [LinkedIn](https://linkedin.com)

[sample@email.com](mailto:sample@email.com) | 555-123-4567

## PROFESSIONAL SUMMARY
This demonstrates professional PDF styling with:
- Proper margins (0.5in \u{d7} 0.6in)
- Dark teal headers (#1a4d5c)
- Blue links (#0056b3)
- Calibri font, 10.5pt
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Sample,
    File(PathBuf),
}

impl ContentSource {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(ContentSource::Sample, ContentSource::File)
    }

    pub fn load(&self) -> Result<Document, RenderError> {
        match self {
            ContentSource::Sample => Ok(Document::parse(SAMPLE_RESUME)),
            ContentSource::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| RenderError::io(path, e))?;
                debug!("Read {} bytes of Markdown from {}", bytes.len(), path.display());
                Document::from_bytes(bytes)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ContentSource::Sample => "built-in sample".to_string(),
            ContentSource::File(path) => path.display().to_string(),
        }
    }
}
