mod config;
mod content;
mod errors;
mod layout;
mod markdown;
mod pdf;
mod render;
mod style;

use anyhow::Result;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::content::ContentSource;
use crate::errors::RenderError;
use crate::pdf::build_engine;
use crate::render::{RenderReport, Renderer};
use crate::style::StyleSheet;

fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume-pdf v{}", env!("CARGO_PKG_VERSION"));

    let source = ContentSource::from_path(config.input.clone());
    println!("🚀 Resume PDF Renderer v{}", env!("CARGO_PKG_VERSION"));
    println!("📖 Content: {}", source.describe());
    println!("🎨 Engine: {}", config.engine);

    let report = run(&config, &source).inspect_err(|e| {
        error!(class = ?e.class(), "Render failed: {e}");
    })?;

    if let Ok(json) = serde_json::to_string(&report) {
        debug!("Render report: {json}");
    }
    println!("✅ Demo PDF created: {}", report.output.display());
    println!(
        "📄 {} page(s), {} bytes via the {} engine",
        report.pages, report.bytes, report.engine
    );
    Ok(())
}

fn run(config: &Config, source: &ContentSource) -> Result<RenderReport, RenderError> {
    let styles = match &config.style {
        Some(path) => {
            info!("Loading style sheet from {}", path.display());
            StyleSheet::load(path)?
        }
        None => StyleSheet::resume(),
    };
    let engine = build_engine(config.engine, config.chrome_path.as_deref())?;
    let document = source.load()?;
    debug!(
        title = document.title().as_deref().unwrap_or("untitled"),
        sections = document.headings().len(),
        "Loaded content"
    );

    let mut renderer = Renderer::new(styles, engine, &config.output);
    if let Some(path) = &config.emit_html {
        renderer = renderer.with_html_output(path);
    }
    renderer.render_document(&document)
}
