use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LoaderConfig;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Image source is empty")]
    Empty,
    #[error("Unable to decode image ({0})")]
    Undecodable(String),
}

/// Codecs tried, in order, when format sniffing fails or the sniffed
/// decoder rejects the data.
const FALLBACK_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Tiff,
    ImageFormat::Ico,
    ImageFormat::Tga,
];

/// Where the pipeline reads its image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(p) => p.display().to_string(),
            ImageSource::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(bytes: &[u8]) -> Self {
        ImageSource::Bytes(bytes.to_vec())
    }
}

/// Decoded 8-bit RGB image. Never mutated after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbImage,
}

impl PixelBuffer {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    pub fn to_gray(&self) -> GrayImage {
        DynamicImage::ImageRgb8(self.image.clone()).to_luma8()
    }
}

/// Read, decode, canonicalize and (optionally) downscale an image.
pub fn load(source: &ImageSource, options: &LoaderConfig) -> Result<PixelBuffer, ImageLoadError> {
    let decoded = match source {
        ImageSource::Path(path) => {
            if !path.exists() {
                return Err(ImageLoadError::NotFound(path.display().to_string()));
            }
            let bytes = fs::read(path)?;
            decode(&bytes)?
        }
        ImageSource::Bytes(bytes) => decode(bytes)?,
    };

    let rgb = to_canonical_rgb(decoded);
    Ok(PixelBuffer::new(limit_width(rgb, options.max_width)))
}

/// Sniffed-format decode first, then every known codec in turn.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageLoadError> {
    if bytes.is_empty() {
        return Err(ImageLoadError::Empty);
    }

    let primary_err = match image::guess_format(bytes) {
        Ok(format) => match image::load_from_memory_with_format(bytes, format) {
            Ok(img) => {
                debug!(?format, "decoded image with sniffed format");
                return Ok(img);
            }
            Err(e) => format!("{format:?} decoder: {e}"),
        },
        Err(e) => e.to_string(),
    };

    for &format in FALLBACK_FORMATS {
        if let Ok(img) = image::load_from_memory_with_format(bytes, format) {
            warn!(?format, reason = %primary_err, "primary decode failed; used fallback codec");
            return Ok(img);
        }
    }

    Err(ImageLoadError::Undecodable(primary_err))
}

/// Flattens alpha onto white and converts any layout to 3-channel RGB.
pub fn to_canonical_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Proportional downscale so the width does not exceed `max_width` (0 = off).
pub fn limit_width(img: RgbImage, max_width: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if max_width == 0 || w <= max_width {
        return img;
    }
    let ratio = f64::from(max_width) / f64::from(w);
    let new_h = ((f64::from(h) * ratio) as u32).max(1);
    debug!(from_w = w, from_h = h, to_w = max_width, to_h = new_h, "resizing input");
    image::imageops::resize(&img, max_width, new_h, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).expect("encode test image");
        out.into_inner()
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load(
            &ImageSource::Path(PathBuf::from("/nonexistent/path/image.png")),
            &LoaderConfig::default(),
        );
        assert!(matches!(result.unwrap_err(), ImageLoadError::NotFound(_)));
    }

    #[test]
    fn garbage_bytes_are_undecodable() {
        let result = decode(b"definitely not an image");
        assert!(matches!(result.unwrap_err(), ImageLoadError::Undecodable(_)));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(decode(&[]).unwrap_err(), ImageLoadError::Empty));
    }

    #[test]
    fn grayscale_png_becomes_three_channel() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(6, 4, Luma([77])));
        let bytes = encode(&gray, ImageFormat::Png);

        let buffer = load(&ImageSource::Bytes(bytes), &LoaderConfig::default()).unwrap();
        assert_eq!(buffer.dimensions(), (6, 4));
        assert_eq!(buffer.as_rgb().get_pixel(0, 0).0, [77, 77, 77]);
    }

    #[test]
    fn headerless_tga_uses_fallback_decoder() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([10, 200, 30])));
        let bytes = encode(&img, ImageFormat::Tga);

        let decoded = decode(&bytes).expect("fallback decode");
        assert_eq!(decoded.to_rgb8().get_pixel(1, 1).0, [10, 200, 30]);
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let rgb = to_canonical_rgb(DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn wide_images_are_scaled_proportionally() {
        let img = RgbImage::from_pixel(1600, 400, Rgb([255, 255, 255]));
        let resized = limit_width(img, 800);
        assert_eq!(resized.dimensions(), (800, 200));

        let narrow = RgbImage::from_pixel(300, 100, Rgb([255, 255, 255]));
        assert_eq!(limit_width(narrow, 800).dimensions(), (300, 100));
    }

    #[test]
    fn loads_from_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("input.png");
        RgbImage::from_pixel(10, 5, Rgb([255, 0, 0]))
            .save(&path)
            .expect("write input image");

        let buffer = load(&ImageSource::from(path.as_path()), &LoaderConfig::default())
            .expect("load image");
        assert_eq!(buffer.dimensions(), (10, 5));
    }
}
