use std::path::{Path, PathBuf};

use ::image::DynamicImage;

use super::image as raster;
use super::rasterize::Rasterizer;
use super::{display_name, input_kind, pdf, read_input, write_output, InputKind, RenderRequest, Renderer};
use crate::config::schema::RendererConfig;
use crate::error::RenderError;
use crate::model::{parse_page_ranges, Operation};

/// Default renderer: lopdf for PDF structure, `image` for raster formats,
/// `pdftoppm` for PDF to image.
pub struct BuiltinRenderer {
    rasterizer: Rasterizer,
    default_dpi: u32,
    default_quality: u8,
}

impl BuiltinRenderer {
    pub fn new(rasterizer: Rasterizer, default_dpi: u32, default_quality: u8) -> Self {
        Self {
            rasterizer,
            default_dpi,
            default_quality,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(
            Rasterizer::new(&config.pdftoppm_path),
            config.dpi,
            config.jpeg_quality,
        )
    }

    fn single_input<'a>(&self, request: &'a RenderRequest) -> Result<&'a Path, RenderError> {
        match request.inputs.as_slice() {
            [input] => Ok(input.as_path()),
            inputs => Err(RenderError::InvalidParams(format!(
                "{} takes exactly one input, got {}",
                request.operation,
                inputs.len()
            ))),
        }
    }

    fn quality(&self, request: &RenderRequest) -> u8 {
        request.params.quality.unwrap_or(self.default_quality)
    }

    /// Decodes an image input, or rasterises the first page of a PDF.
    fn load_raster(&self, input: &Path, request: &RenderRequest) -> Result<DynamicImage, RenderError> {
        let name = display_name(input);
        let bytes = match input_kind(input)? {
            InputKind::Pdf => {
                let dpi = request.params.dpi.unwrap_or(self.default_dpi);
                self.rasterizer
                    .first_page_png(input, dpi, &request.output_dir)?
            }
            InputKind::Image(_) => read_input(input)?,
        };
        raster::decode(&bytes, &name)
    }

    /// Loads an input as a PDF document, wrapping images in a one-page PDF.
    fn load_document(&self, input: &Path, request: &RenderRequest) -> Result<lopdf::Document, RenderError> {
        let name = display_name(input);
        let bytes = read_input(input)?;
        match input_kind(input)? {
            InputKind::Pdf => pdf::load(&bytes, &name),
            InputKind::Image(_) => {
                let img = raster::decode(&bytes, &name)?;
                let wrapped = raster::image_to_pdf(&img, self.quality(request))?;
                pdf::load(&wrapped, &name)
            }
        }
    }

    fn require_pdf(&self, input: &Path) -> Result<(), RenderError> {
        match input_kind(input)? {
            InputKind::Pdf => Ok(()),
            InputKind::Image(_) => Err(RenderError::UnsupportedInput {
                name: display_name(input),
                reason: "expected a PDF".to_string(),
            }),
        }
    }

    fn produce(&self, request: &RenderRequest) -> Result<Vec<u8>, RenderError> {
        match request.operation {
            Operation::ToJpg => {
                let img = self.load_raster(self.single_input(request)?, request)?;
                raster::encode_jpeg(&img, self.quality(request))
            }
            Operation::ToPng => {
                let img = self.load_raster(self.single_input(request)?, request)?;
                raster::encode_png(&img)
            }
            Operation::ToPdf => {
                let mut doc = self.load_document(self.single_input(request)?, request)?;
                pdf::save(&mut doc)
            }
            Operation::Compress => {
                let input = self.single_input(request)?;
                self.require_pdf(input)?;
                let doc = pdf::load(&read_input(input)?, &display_name(input))?;
                pdf::compress(doc)
            }
            Operation::Merge => {
                if request.inputs.len() < Operation::Merge.min_inputs() {
                    return Err(RenderError::InvalidParams(format!(
                        "MERGE needs at least {} inputs, got {}",
                        Operation::Merge.min_inputs(),
                        request.inputs.len()
                    )));
                }
                let docs = request
                    .inputs
                    .iter()
                    .map(|input| self.load_document(input, request))
                    .collect::<Result<Vec<_>, _>>()?;
                pdf::merge(docs)
            }
            Operation::Split => {
                let input = self.single_input(request)?;
                self.require_pdf(input)?;
                let ranges_text = request.params.page_ranges.as_deref().unwrap_or_default();
                let ranges = parse_page_ranges(ranges_text)
                    .map_err(|e| RenderError::InvalidParams(e.to_string()))?;
                let doc = pdf::load(&read_input(input)?, &display_name(input))?;
                let parts = pdf::split(&doc, &ranges)?;
                pdf::zip_parts(&parts)
            }
        }
    }
}

impl Renderer for BuiltinRenderer {
    fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError> {
        let _span = tracing::info_span!(
            "render",
            operation = %request.operation,
            inputs = request.inputs.len()
        )
        .entered();

        let bytes = self.produce(request)?;
        let output = request.output_file();
        write_output(&output, &bytes)?;

        log::debug!(
            "Rendered {} ({} bytes) to {}",
            request.operation,
            bytes.len(),
            output.display()
        );
        Ok(output)
    }
}
