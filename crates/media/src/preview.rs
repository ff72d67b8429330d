//! Preview (thumbnail) derivation.
//!
//! Images are decoded, bounded to a maximum edge and re-encoded as JPEG.
//! Videos are not decoded; their duration is read from the container when
//! possible. Derivation never fails the caller: any problem degrades to "no
//! preview" and whatever metadata could still be determined.

use crate::error::{ErrorKind, Result};
use crate::models::{Dimensions, FileHandle, MediaKind, MediaMetadata};
use crate::probe;
use exn::ResultExt;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::instrument;

pub const DEFAULT_MAX_EDGE: u32 = 300;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    /// Longest edge of the generated thumbnail, in pixels.
    pub max_edge: u32,
    pub jpeg_quality: u8,
}
impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_edge: DEFAULT_MAX_EDGE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Everything derived from a source file at ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    /// JPEG bytes, or empty when no preview could be made.
    pub preview: Vec<u8>,
    pub metadata: MediaMetadata,
}

/// Derive a preview and metadata for `file`.
///
/// This is CPU-bound; call it from a blocking task when running on an async
/// runtime.
#[instrument(level = "debug", skip(file, options), fields(name = %file.name, size = file.bytes.len()))]
pub fn derive(file: &FileHandle, kind: MediaKind, options: &PreviewOptions) -> Derived {
    let mime = file.resolved_mime_type();
    let format = probe::format_label(mime.as_deref(), &file.name);
    match kind {
        MediaKind::Image => match thumbnail(&file.bytes, options) {
            Ok((preview, dimensions)) => Derived {
                preview,
                metadata: MediaMetadata {
                    dimensions: Some(dimensions),
                    duration_seconds: None,
                    format,
                },
            },
            Err(e) => {
                tracing::warn!(name = %file.name, error = ?e, "Could not derive preview; storing without one");
                Derived {
                    preview: Vec::new(),
                    metadata: MediaMetadata { format, ..Default::default() },
                }
            },
        },
        MediaKind::Video => Derived {
            preview: Vec::new(),
            metadata: MediaMetadata {
                dimensions: None,
                duration_seconds: probe::mp4_duration_seconds(&file.bytes),
                format,
            },
        },
    }
}

/// Decode an image, shrink it to fit `max_edge` and encode it as JPEG.
///
/// Returns the JPEG bytes and the dimensions of the *original* image.
pub fn thumbnail(bytes: &[u8], options: &PreviewOptions) -> Result<(Vec<u8>, Dimensions)> {
    let decoded = image::load_from_memory(bytes).or_raise(|| ErrorKind::Preview)?;
    let (width, height) = decoded.dimensions();
    let (target_width, target_height) = target_size(width, height, options.max_edge);
    let resized = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_width, target_height, FilterType::Triangle)
    };
    let jpeg = encode_jpeg(&resized, options.jpeg_quality)?;
    Ok((jpeg, Dimensions { width, height }))
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG has no alpha channel.
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&rgb)
        .or_raise(|| ErrorKind::Preview)?;
    Ok(out)
}

/// Scale `(width, height)` down so the longest edge is at most `max_edge`,
/// preserving aspect ratio. Images that already fit are left alone.
pub fn target_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }
    if width >= height {
        let scaled = (f64::from(height) * f64::from(max_edge) / f64::from(width)).round() as u32;
        (max_edge, scaled.max(1))
    } else {
        let scaled = (f64::from(width) * f64::from(max_edge) / f64::from(height)).round() as u32;
        (scaled.max(1), max_edge)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[rstest]
    #[case((100, 50), 300, (100, 50))]
    #[case((600, 300), 300, (300, 150))]
    #[case((300, 900), 300, (100, 300))]
    #[case((5000, 1), 300, (300, 1))]
    #[case((300, 300), 300, (300, 300))]
    fn test_target_size(#[case] input: (u32, u32), #[case] max_edge: u32, #[case] expected: (u32, u32)) {
        assert_eq!(target_size(input.0, input.1, max_edge), expected);
    }

    #[test]
    fn test_thumbnail_is_bounded_jpeg() {
        let (jpeg, dimensions) = thumbnail(&png_bytes(640, 320), &PreviewOptions::default()).unwrap();
        assert_eq!(dimensions, Dimensions { width: 640, height: 320 });
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "preview should be a JPEG");
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (300, 150));
    }

    #[test]
    fn test_derive_image() {
        let file = FileHandle::new("tiny.png", png_bytes(10, 20), 1).with_mime_type("image/png");
        let derived = derive(&file, MediaKind::Image, &PreviewOptions::default());
        assert!(!derived.preview.is_empty());
        assert_eq!(derived.metadata.dimensions, Some(Dimensions { width: 10, height: 20 }));
        assert_eq!(derived.metadata.format, "png");
        assert_eq!(derived.metadata.duration_seconds, None);
    }

    #[test]
    fn test_derive_degrades_on_undecodable_image() {
        let file = FileHandle::new("broken.jpg", b"\xFF\xD8 this is not a jpeg".to_vec(), 1);
        let derived = derive(&file, MediaKind::Image, &PreviewOptions::default());
        assert!(derived.preview.is_empty());
        assert_eq!(derived.metadata.dimensions, None);
        assert_eq!(derived.metadata.format, "jpeg");
    }

    #[test]
    fn test_derive_video_reads_duration() {
        let bytes = crate::probe::tests::minimal_mp4(600, 1800);
        let file = FileHandle::new("clip.mp4", bytes, 1);
        let derived = derive(&file, MediaKind::Video, &PreviewOptions::default());
        assert!(derived.preview.is_empty());
        assert_eq!(derived.metadata.duration_seconds, Some(3.0));
        assert_eq!(derived.metadata.format, "mp4");
    }
}
