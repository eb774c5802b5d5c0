use crate::error::ChartResult;
use crate::render::{CairoSurface, decode_png_with_cairo};
use crate::shim::ImageDecoder;

use super::SurfaceProvider;

/// Fontconfig alias Pango resolves on every platform.
pub const CAIRO_PRESET_FONT: &str = "Sans";

/// Cairo/Pango provider with real text shaping.
#[derive(Debug, Clone)]
pub struct CairoSurfaceProvider {
    decoder: ImageDecoder,
}

impl CairoSurfaceProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoder: ImageDecoder::new("cairo-png", decode_png_with_cairo),
        }
    }
}

impl Default for CairoSurfaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceProvider for CairoSurfaceProvider {
    type Surface = CairoSurface;

    fn name(&self) -> &'static str {
        "cairo"
    }

    fn create_surface(&self, width: u32, height: u32) -> ChartResult<CairoSurface> {
        CairoSurface::new(width, height)
    }

    fn image_decoder(&self) -> ImageDecoder {
        self.decoder.clone()
    }

    fn preset_font(&self) -> Option<&str> {
        Some(CAIRO_PRESET_FONT)
    }
}
