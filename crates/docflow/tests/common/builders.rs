//! Fixture builders for documents and submissions.

#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation as PdfOperation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use docflow::model::{JobParams, Operation};
use docflow::submission::{SubmitRequest, UploadedFile};

/// Builder for small text-only PDFs.
pub struct PdfBuilder {
    pages: u32,
    label: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            pages: 1,
            label: "page".to_string(),
        }
    }

    pub fn pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    /// Each page shows "<label> <n>".
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for i in 1..=self.pages {
            let content = Content {
                operations: vec![
                    PdfOperation::new("BT", vec![]),
                    PdfOperation::new("Tf", vec!["F1".into(), 18.into()]),
                    PdfOperation::new("Td", vec![72.into(), 720.into()]),
                    PdfOperation::new(
                        "Tj",
                        vec![Object::String(
                            format!("{} {}", self.label, i).into_bytes(),
                            StringFormat::Literal,
                        )],
                    ),
                    PdfOperation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode page content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save pdf");
        bytes
    }
}

/// A solid-colour PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub fn pdf_file(name: &str, pages: u32) -> UploadedFile {
    UploadedFile::new(name, PdfBuilder::new().pages(pages).label(name).build())
}

pub fn png_file(name: &str) -> UploadedFile {
    UploadedFile::new(name, png(32, 24))
}

pub fn split_request(file: UploadedFile, ranges: &str) -> SubmitRequest {
    SubmitRequest::new(Operation::Split, vec![file]).with_params(JobParams {
        page_ranges: Some(ranges.to_string()),
        ..Default::default()
    })
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).expect("load pdf").get_pages().len()
}
