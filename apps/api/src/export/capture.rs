//! Bitmap capture of the rendered resume.
//!
//! The server never lays out HTML itself: the browser rasterizes the preview
//! element at a supersampled scale and uploads it. `Rasterizer` is the seam
//! so the raster exporter does not care where the pixels come from.

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::data_url::DataUrl;
use crate::export::ExportError;

/// Lowest accepted supersampling factor for print-quality output.
pub const MIN_SUPERSAMPLE: f32 = 2.0;

/// One opaque RGB bitmap of the whole resume element.
#[derive(Debug, Clone)]
pub struct Capture {
    pub image: RgbImage,
    /// Device pixels per CSS pixel used when the bitmap was taken.
    pub scale: f32,
}

impl Capture {
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }

    pub fn height_px(&self) -> u32 {
        self.image.height()
    }
}

#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Produces exactly one capture per call.
    async fn rasterize(&self) -> Result<Capture, ExportError>;
}

/// A PNG or JPEG capture uploaded by the client.
#[derive(Debug, Clone)]
pub struct UploadedCapture {
    encoded: Bytes,
    scale: f32,
}

impl UploadedCapture {
    pub fn from_data_url(url: &str, scale: f32) -> Result<Self, ExportError> {
        if !scale.is_finite() || scale < MIN_SUPERSAMPLE {
            return Err(ExportError::Rasterize(format!(
                "capture scale {scale} is below the minimum of {MIN_SUPERSAMPLE}"
            )));
        }
        let parsed = DataUrl::parse(url).map_err(|e| ExportError::Rasterize(e.to_string()))?;
        if !matches!(parsed.mime.as_str(), "" | "image/png" | "image/jpeg" | "image/jpg") {
            return Err(ExportError::Rasterize(format!(
                "unsupported capture type '{}'",
                parsed.mime
            )));
        }
        Ok(Self {
            encoded: Bytes::from(parsed.bytes),
            scale,
        })
    }
}

#[async_trait]
impl Rasterizer for UploadedCapture {
    async fn rasterize(&self) -> Result<Capture, ExportError> {
        let encoded = self.encoded.clone();
        let scale = self.scale;
        tokio::task::spawn_blocking(move || decode_capture(&encoded, scale))
            .await
            .map_err(|e| ExportError::Task(e.to_string()))?
    }
}

/// Decodes an encoded bitmap and flattens it onto white.
pub fn decode_capture(encoded: &[u8], scale: f32) -> Result<Capture, ExportError> {
    let decoded = image::load_from_memory(encoded)
        .map_err(|e| ExportError::Rasterize(format!("decode: {e}")))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ExportError::Rasterize("capture has no pixels".to_string()));
    }
    let image = match decoded {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => flatten_on_white(&other.to_rgba8()),
    };
    Ok(Capture { image, scale })
}

/// Composites `rgba` over an opaque white background.
pub fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
