use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::pdf::EngineKind;

const DEFAULT_OUTPUT: &str = "demo_resume.pdf";

/// Runtime configuration loaded from environment variables (and `.env`).
/// Every key is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Markdown file to render; the built-in sample when unset.
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    /// Where to write the composed HTML page, if anywhere.
    pub emit_html: Option<PathBuf>,
    /// JSON style sheet replacing the built-in resume sheet.
    pub style: Option<PathBuf>,
    pub engine: EngineKind,
    pub chrome_path: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str| var(key).map(PathBuf::from);

        let engine = match var("PDF_ENGINE") {
            Some(value) => value
                .parse::<EngineKind>()
                .map_err(anyhow::Error::msg)
                .context("PDF_ENGINE must be 'layout' or 'chrome'")?,
            None => EngineKind::default(),
        };

        Ok(Config {
            input: path("RESUME_INPUT"),
            output: path("RESUME_OUTPUT").unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            emit_html: path("RESUME_EMIT_HTML"),
            style: path("RESUME_STYLE"),
            engine,
            chrome_path: path("CHROME_PATH"),
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
