//! Document transformations run by workers.
//!
//! The pipeline only depends on the [`Renderer`] trait. [`BuiltinRenderer`]
//! covers every operation with lopdf, image and zip, shelling out to
//! `pdftoppm` to rasterise PDF pages.

pub mod builtin;
pub mod image;
pub mod pdf;
pub mod rasterize;

use std::path::{Path, PathBuf};

pub use builtin::BuiltinRenderer;

use crate::error::RenderError;
use crate::model::{JobParams, Operation};

/// One transformation: every input of a job, in upload order.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub operation: Operation,
    pub inputs: Vec<PathBuf>,
    pub params: JobParams,
    /// Scratch directory the renderer writes its single output file into.
    pub output_dir: PathBuf,
}

impl RenderRequest {
    /// Where the renderer should write its result.
    pub fn output_file(&self) -> PathBuf {
        self.output_dir
            .join(format!("output.{}", self.operation.output_extension()))
    }
}

pub trait Renderer: Send + Sync {
    /// Produces the result of `request` and returns the path of the file
    /// written inside `request.output_dir`.
    fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError>;
}

/// Broad input family, decided from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Image(::image::ImageFormat),
}

pub fn input_kind(path: &Path) -> Result<InputKind, RenderError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if extension == "pdf" {
        return Ok(InputKind::Pdf);
    }
    match ::image::ImageFormat::from_extension(&extension) {
        Some(format) if format.reading_enabled() => Ok(InputKind::Image(format)),
        _ => Err(RenderError::UnsupportedInput {
            name: display_name(path),
            reason: format!("unsupported file type '{}'", extension),
        }),
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input")
        .to_string()
}

pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>, RenderError> {
    std::fs::read(path).map_err(|e| RenderError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    std::fs::write(path, bytes).map_err(|e| RenderError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
