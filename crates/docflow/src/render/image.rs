//! Raster encoding and image-to-PDF conversion.

use ::image::codecs::jpeg::JpegEncoder;
use ::image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::RenderError;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

pub fn decode(bytes: &[u8], name: &str) -> Result<DynamicImage, RenderError> {
    ::image::load_from_memory(bytes).map_err(|e| RenderError::UnsupportedInput {
        name: name.to_string(),
        reason: format!("failed to decode image: {}", e),
    })
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder
            .encode_image(&rgb)
            .map_err(|e| RenderError::Corrupt(format!("JPEG encoding failed: {}", e)))?;
    }
    Ok(buffer)
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, RenderError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| RenderError::Corrupt(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Wraps an image in a one-page PDF whose page matches the image size.
///
/// The image is embedded as a JPEG (`DCTDecode`) at `quality`.
pub fn image_to_pdf(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::Corrupt("image has no pixels".to_string()));
    }
    let jpeg = encode_jpeg(img, quality)?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! {
            "Im1" => image_id,
        },
    });

    let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im1 Do\nQ\n", width, height);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Corrupt(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgb, RgbImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([200, 30, 30])))
    }

    #[test]
    fn test_encode_jpeg_and_decode() {
        let jpeg = encode_jpeg(&sample(), 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = decode(&jpeg, "x.jpg").unwrap();
        assert_eq!(decoded.dimensions(), (8, 4));
    }

    #[test]
    fn test_lower_quality_is_not_larger() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        }));
        let high = encode_jpeg(&img, 100).unwrap();
        let low = encode_jpeg(&img, 10).unwrap();
        assert!(low.len() <= high.len());
    }

    #[test]
    fn test_encode_png() {
        let png = encode_png(&sample()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode(b"definitely not an image", "bad.png"),
            Err(RenderError::UnsupportedInput { .. })
        ));
    }

    #[test]
    fn test_image_to_pdf() {
        let pdf = image_to_pdf(&sample(), 80).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
