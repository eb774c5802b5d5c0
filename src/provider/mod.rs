//! Surface providers: where sessions get their drawing targets and where the
//! image decoder installed into the process-wide slot comes from.

mod raster;

#[cfg(feature = "cairo-backend")]
mod cairo_provider;

pub use raster::RasterSurfaceProvider;

#[cfg(feature = "cairo-backend")]
pub use cairo_provider::{CAIRO_PRESET_FONT, CairoSurfaceProvider};

use std::fmt;
use std::sync::Arc;

use crate::error::ChartResult;
use crate::render::Surface;
use crate::shim::ImageDecoder;

/// Capability supplying fixed-size surfaces and an image decoder.
pub trait SurfaceProvider: Send + Sync + 'static {
    type Surface: Surface;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn create_surface(&self, width: u32, height: u32) -> ChartResult<Self::Surface>;

    /// Decoder installed into the process-wide slot while a service runs.
    fn image_decoder(&self) -> ImageDecoder;

    /// Font family the provider's surfaces render best with.
    ///
    /// Used when the service config leaves `font` unset.
    fn preset_font(&self) -> Option<&str> {
        None
    }
}

type ProviderFactory<P> = Box<dyn FnOnce() -> ChartResult<P> + Send>;

/// How a service obtains its provider.
pub enum ProviderBinding<P: SurfaceProvider> {
    /// The host hands over a ready provider.
    Injected(Arc<P>),
    /// The provider is constructed once, when the service starts.
    Deferred(ProviderFactory<P>),
}

impl<P: SurfaceProvider> ProviderBinding<P> {
    pub fn injected(provider: P) -> Self {
        Self::Injected(Arc::new(provider))
    }

    pub fn deferred<F>(factory: F) -> Self
    where
        F: FnOnce() -> ChartResult<P> + Send + 'static,
    {
        Self::Deferred(Box::new(factory))
    }

    pub fn resolve(self) -> ChartResult<Arc<P>> {
        match self {
            Self::Injected(provider) => Ok(provider),
            Self::Deferred(factory) => factory().map(Arc::new),
        }
    }
}

impl<P: SurfaceProvider> From<Arc<P>> for ProviderBinding<P> {
    fn from(provider: Arc<P>) -> Self {
        Self::Injected(provider)
    }
}

impl<P: SurfaceProvider> fmt::Debug for ProviderBinding<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Injected(provider) => f.debug_tuple("Injected").field(&provider.name()).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}
