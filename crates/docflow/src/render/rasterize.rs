use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::RenderError;

pub const DEFAULT_PDFTOPPM: &str = "pdftoppm";

/// Renders PDF pages to PNG through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: PathBuf,
}

impl Rasterizer {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Renders the first page of `pdf` at `dpi` and returns the PNG bytes.
    pub fn first_page_png(&self, pdf: &Path, dpi: u32, scratch: &Path) -> Result<Vec<u8>, RenderError> {
        let _span = tracing::info_span!("render.rasterize", dpi).entered();

        let prefix = scratch.join(format!("page_{}", uuid::Uuid::new_v4()));
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-singlefile")
            .args(["-f", "1", "-l", "1"])
            .args(["-r", &dpi.to_string()])
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| RenderError::Tool {
                tool: self.program.display().to_string(),
                reason: format!("failed to start: {}. Make sure poppler-utils is installed.", e),
            })?;

        if !output.status.success() {
            return Err(RenderError::Tool {
                tool: self.program.display().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // -singlefile writes exactly `<prefix>.png`.
        let rendered = prefix.with_extension("png");
        let bytes = std::fs::read(&rendered).map_err(|e| RenderError::Io {
            path: rendered.clone(),
            source: e,
        })?;
        let _ = std::fs::remove_file(&rendered);
        Ok(bytes)
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(DEFAULT_PDFTOPPM)
    }
}
