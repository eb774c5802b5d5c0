mod frame;
mod primitives;
mod raster;

pub use frame::RenderFrame;
pub use primitives::{
    Color, ImagePrimitive, LinePrimitive, RectPrimitive, TextHAlign, TextPrimitive,
};
pub use raster::RasterSurface;

use serde::{Deserialize, Serialize};

use crate::core::Viewport;
use crate::error::ChartResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized, deterministic `RenderFrame` so
/// drawing code remains isolated from chart option parsing and layout.
pub trait Renderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()>;
}

/// Fixed-size drawing target that can serialize its pixels.
pub trait Surface: Renderer + Send + 'static {
    fn viewport(&self) -> Viewport;

    fn encode(&self, format: ImageFormat) -> ChartResult<Vec<u8>>;

    fn stats(&self) -> RenderStats;
}

/// Encoded raster formats a surface can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
}

impl ImageFormat {
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
        }
    }
}

/// Eight-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Primitive counts from the most recent draw pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderStats {
    pub lines_drawn: usize,
    pub rects_drawn: usize,
    pub texts_drawn: usize,
    pub texts_skipped: usize,
    pub images_drawn: usize,
}

#[cfg(feature = "cairo-backend")]
mod cairo_backend;
#[cfg(feature = "cairo-backend")]
pub use cairo_backend::{CairoSurface, decode_png_with_cairo};
