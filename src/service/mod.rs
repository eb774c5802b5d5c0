//! The chart service: configuration, session creation and the lifetime of the
//! image decoder shim.

mod config;
mod element;
mod session;

pub use config::{ChartServiceConfig, DEFAULT_FONT};
pub use element::ImageElement;
pub use session::{ChartSession, RenderCompletion, SessionState};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::core::{ChartOptions, Viewport, ensure_recognized_keys};
use crate::engine::ChartEngine;
use crate::error::ChartResult;
use crate::provider::{ProviderBinding, SurfaceProvider};
use crate::shim::{self, ShimGuard};

/// Stable name the host registers this service under.
pub const SERVICE_NAME: &str = "echarts";

/// Capabilities the host must provide before this service starts.
///
/// `canvas` is the surface provider handed to [`ChartService::start`]; it is
/// logged with the start event so hosts can check their wiring order.
pub const REQUIRED_CAPABILITIES: &[&str] = &["canvas"];

pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Running chart service.
///
/// While it runs, the provider's image decoder occupies the process-wide
/// decoder slot; [`ChartService::stop`] or drop restores the previous value.
#[derive(Debug)]
pub struct ChartService<P: SurfaceProvider> {
    config: ChartServiceConfig,
    font: String,
    provider: Arc<P>,
    shim: Option<ShimGuard>,
}

impl<P: SurfaceProvider> ChartService<P> {
    pub fn start(config: ChartServiceConfig, binding: ProviderBinding<P>) -> ChartResult<Self> {
        config.validate()?;
        let provider = binding.resolve()?;
        let font = config.resolve_font(provider.preset_font());
        let guard = shim::install(provider.image_decoder());
        info!(
            service = SERVICE_NAME,
            requires = ?REQUIRED_CAPABILITIES,
            provider = provider.name(),
            font = %font,
            "chart service started"
        );

        Ok(Self {
            config,
            font,
            provider,
            shim: Some(guard),
        })
    }

    /// Starts with a provider handed over directly by the host.
    pub fn with_provider(config: ChartServiceConfig, provider: P) -> ChartResult<Self> {
        Self::start(config, ProviderBinding::injected(provider))
    }

    #[must_use]
    pub fn config(&self) -> &ChartServiceConfig {
        &self.config
    }

    /// Family layered under caller options: configured, provider preset, or
    /// [`DEFAULT_FONT`].
    #[must_use]
    pub fn font(&self) -> &str {
        &self.font
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Allocates a surface, binds an engine to it and applies `options` over
    /// the configured default font.
    ///
    /// On an option error the fresh engine is disposed before returning.
    pub fn create_chart(
        &self,
        width: u32,
        height: u32,
        options: &ChartOptions,
    ) -> ChartResult<ChartSession<P::Surface>> {
        let viewport = Viewport::new(width, height).validated()?;
        let surface = self.provider.create_surface(width, height)?;
        let engine = ChartEngine::init(surface);

        let layered = ChartOptions::layered(&self.font, options);
        if let Err(err) = engine.set_option(&layered) {
            engine.dispose();
            return Err(err);
        }

        debug!(
            width,
            height,
            provider = self.provider.name(),
            "chart session created"
        );
        Ok(ChartSession::new(engine, viewport))
    }

    /// Like [`ChartService::create_chart`], but rejects top-level option keys
    /// the engine does not read instead of ignoring them.
    pub fn create_chart_strict(
        &self,
        width: u32,
        height: u32,
        options: &ChartOptions,
    ) -> ChartResult<ChartSession<P::Surface>> {
        ensure_recognized_keys(options)?;
        self.create_chart(width, height, options)
    }

    /// Restores the decoder slot to its value from before `start`.
    pub fn stop(mut self) {
        if let Some(guard) = self.shim.take() {
            guard.restore();
        }
        info!(service = SERVICE_NAME, "chart service stopped");
    }
}
