//! HTML engine backed by a locally installed Chrome/Chromium in headless mode.
//!
//! The composed HTML page is written to a scratch directory and printed with
//! `--print-to-pdf`; the browser applies the `@page` rule and the full CSS
//! cascade itself.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::{debug, info};

use crate::errors::RenderError;
use crate::pdf::{EngineInput, PdfEngine};

/// Executable names tried on `PATH`, in order.
const CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Bytes escaped in the path of a `file://` URL.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone)]
pub struct ChromeEngine {
    binary: PathBuf,
}

impl ChromeEngine {
    /// Uses `explicit` when given, otherwise searches `PATH`.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, RenderError> {
        let binary = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => {
                return Err(RenderError::Engine(format!(
                    "Chrome executable not found at {}",
                    path.display()
                )))
            }
            None => {
                let path = env::var_os("PATH").unwrap_or_default();
                find_in(env::split_paths(&path), CANDIDATES).ok_or_else(|| {
                    RenderError::Engine(
                        "no Chrome/Chromium on PATH; set CHROME_PATH or use PDF_ENGINE=layout"
                            .to_string(),
                    )
                })?
            }
        };
        info!("Using Chrome at {}", binary.display());
        Ok(ChromeEngine { binary })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

fn find_in(dirs: impl IntoIterator<Item = PathBuf>, names: &[&str]) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = dirs.into_iter().collect();
    names.iter().find_map(|name| {
        dirs.iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

impl PdfEngine for ChromeEngine {
    fn name(&self) -> &'static str {
        "chrome"
    }

    fn render(&self, input: &EngineInput<'_>) -> Result<Vec<u8>, RenderError> {
        let scratch = tempfile::tempdir().map_err(|e| RenderError::io(env::temp_dir(), e))?;
        let html_path = scratch.path().join("resume.html");
        let pdf_path = scratch.path().join("resume.pdf");
        std::fs::write(&html_path, input.html).map_err(|e| RenderError::io(&html_path, e))?;

        debug!("Printing {} with {}", html_path.display(), self.binary().display());
        let output = Command::new(&self.binary)
            .args(print_args(&html_path, &pdf_path, running_as_root()))
            .output()
            .map_err(|e| RenderError::io(&self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Engine(format!(
                "Chrome exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        match std::fs::read(&pdf_path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RenderError::EmptyOutput),
            Err(e) => Err(RenderError::io(&pdf_path, e)),
        }
    }
}

fn print_args(html_path: &Path, pdf_path: &Path, as_root: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--headless".into(),
        "--disable-gpu".into(),
        "--no-pdf-header-footer".into(),
    ];
    // Chrome refuses to start its sandbox as root (typical in containers).
    if as_root {
        args.push("--no-sandbox".into());
    }
    let mut print_to = OsString::from("--print-to-pdf=");
    print_to.push(pdf_path);
    args.push(print_to);
    args.push(file_url(html_path).into());
    args
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    let encoded = utf8_percent_encode(&path, PATH_ESCAPES);
    if path.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata("/proc/self").is_ok_and(|meta| meta.uid() == 0)
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}
