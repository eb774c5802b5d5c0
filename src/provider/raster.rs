use crate::error::{ChartError, ChartResult};
use crate::render::RasterSurface;
use crate::shim::{DecodedImage, ImageDecoder};

use super::SurfaceProvider;

/// Pure-Rust provider backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct RasterSurfaceProvider {
    decoder: ImageDecoder,
    preset_font: Option<String>,
}

impl RasterSurfaceProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoder: ImageDecoder::new("image-rs", decode_with_image_crate),
            preset_font: None,
        }
    }

    /// Advertises `font` as the preset family for services without one configured.
    #[must_use]
    pub fn with_preset_font(mut self, font: impl Into<String>) -> Self {
        self.preset_font = Some(font.into());
        self
    }
}

impl Default for RasterSurfaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceProvider for RasterSurfaceProvider {
    type Surface = RasterSurface;

    fn name(&self) -> &'static str {
        "raster"
    }

    fn create_surface(&self, width: u32, height: u32) -> ChartResult<RasterSurface> {
        RasterSurface::new(width, height)
    }

    fn image_decoder(&self) -> ImageDecoder {
        self.decoder.clone()
    }

    fn preset_font(&self) -> Option<&str> {
        self.preset_font.as_deref()
    }
}

fn decode_with_image_crate(bytes: &[u8]) -> ChartResult<DecodedImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| ChartError::Decode(format!("image decode error: {err}")))?
        .into_rgba8();
    let (width, height) = decoded.dimensions();
    DecodedImage::new(width, height, decoded.into_raw())
}
