//! Lossless-first image optimisation.
//!
//! PNGs are re-encoded at the highest compression level after dropping
//! 16-bit channels and an unused alpha channel; JPEGs are re-encoded at the
//! configured quality; SVGs lose comments, metadata and inter-tag
//! whitespace. Whatever the result, the smaller of the original and the
//! optimised bytes is kept.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use std::path::Path;
use thiserror::Error;

/// Error optimising an image
#[derive(Debug, Error)]
pub enum ImageError {
    /// The file could not be decoded as its extension claims
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    /// Re-encoding failed
    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Image format, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Svg,
    /// Copied verbatim
    Other,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => ImageKind::Png,
            Some("jpg" | "jpeg") => ImageKind::Jpeg,
            Some("svg") => ImageKind::Svg,
            _ => ImageKind::Other,
        }
    }
}

/// Optimise the contents of the image at `path`.
///
/// Never returns more bytes than it was given.
pub fn optimize(path: &Path, data: &[u8], jpeg_quality: u8) -> Result<Vec<u8>, ImageError> {
    let optimized = match ImageKind::from_path(path) {
        ImageKind::Png => optimize_png(data)?,
        ImageKind::Jpeg => optimize_jpeg(data, jpeg_quality)?,
        ImageKind::Svg => match std::str::from_utf8(data) {
            Ok(text) => optimize_svg(text).into_bytes(),
            Err(_) => data.to_vec(),
        },
        ImageKind::Other => return Ok(data.to_vec()),
    };
    Ok(if optimized.len() < data.len() { optimized } else { data.to_vec() })
}

fn optimize_png(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Png).map_err(ImageError::Decode)?;
    let img = reduce_png(img);

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .map_err(ImageError::Encode)?;
    Ok(out)
}

/// Drop precision and channels that carry no information.
fn reduce_png(img: DynamicImage) -> DynamicImage {
    let img = match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => img,
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    };

    match &img {
        DynamicImage::ImageRgba8(rgba) if rgba.pixels().all(|p| p[3] == u8::MAX) => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        DynamicImage::ImageLumaA8(la) if la.pixels().all(|p| p[1] == u8::MAX) => {
            DynamicImage::ImageLuma8(img.to_luma8())
        }
        _ => img,
    }
}

fn optimize_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg).map_err(ImageError::Decode)?;
    let rgb = img.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(ImageError::Encode)?;
    Ok(out)
}

static_regex!(svg_junk_re, r"(?s)<\?xml.*?\?>|<!--.*?-->|<!DOCTYPE[^>]*>|<metadata\b.*?</metadata>");
static_regex!(svg_between_tags_re, r">\s+<");

/// Strip the XML prolog, comments, doctype and metadata, and whitespace between tags.
pub fn optimize_svg(text: &str) -> String {
    let stripped = svg_junk_re().replace_all(text, "");
    svg_between_tags_re().replace_all(&stripped, "><").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode_png(img: &DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter)
            .write_image(img.as_bytes(), img.width(), img.height(), img.color())
            .unwrap();
        out
    }

    fn gradient() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8]))
    }

    #[test]
    fn test_image_kind_from_path() {
        assert_eq!(ImageKind::from_path(Path::new("a/icon.PNG")), ImageKind::Png);
        assert_eq!(ImageKind::from_path(Path::new("b.jpeg")), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_path(Path::new("c.svg")), ImageKind::Svg);
        assert_eq!(ImageKind::from_path(Path::new("d.gif")), ImageKind::Other);
    }

    #[test]
    fn test_opaque_png_loses_alpha_and_keeps_pixels() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([10, 20, 30, 255])));
        let original = encode_png(&img);
        let optimized = optimize(Path::new("icon.png"), &original, 75).unwrap();
        assert!(optimized.len() <= original.len());

        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert_eq!(decoded.to_rgb8().get_pixel(5, 5), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_sixteen_bit_png_reduced() {
        let img: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_fn(32, 32, |x, _| Rgb([(x * 2000) as u16, 0, 65535]));
        let original = encode_png(&DynamicImage::ImageRgb16(img));
        let optimized = optimize(Path::new("deep.png"), &original, 75).unwrap();
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_translucent_png_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 128])));
        let optimized = optimize_png(&encode_png(&img)).unwrap();
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgba8);
    }

    #[test]
    fn test_jpeg_never_grows() {
        let img = gradient();
        let mut original = Vec::new();
        JpegEncoder::new_with_quality(&mut original, 100)
            .encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
            .unwrap();
        let optimized = optimize(Path::new("photo.jpg"), &original, 50).unwrap();
        assert!(optimized.len() < original.len());
        assert!(image::load_from_memory(&optimized).is_ok());
    }

    #[test]
    fn test_other_formats_copied() {
        let data = b"GIF89a-not-really".to_vec();
        assert_eq!(optimize(Path::new("anim.gif"), &data, 75).unwrap(), data);
    }

    #[test]
    fn test_corrupt_png_is_an_error() {
        let err = optimize(Path::new("bad.png"), b"not a png", 75).unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_optimize_svg() {
        let svg = "<?xml version=\"1.0\"?>\n<!-- editor -->\n<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <metadata>junk</metadata>\n  <rect width=\"1\"/>\n</svg>\n";
        assert_eq!(
            optimize_svg(svg),
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><rect width=\"1\"/></svg>"
        );
        let optimized = optimize(Path::new("logo.svg"), svg.as_bytes(), 75).unwrap();
        assert!(optimized.len() < svg.len());
    }
}
