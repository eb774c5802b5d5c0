//! chart-snapshot: off-screen chart rendering sessions.
//!
//! A [`ChartService`] hands out [`ChartSession`]s, each owning one drawing
//! surface and the charting engine bound to it. Sessions export their surface
//! as a PNG [`ImageElement`] once the engine reports the render finished, or
//! once a timeout passes, whichever happens first.

pub mod core;
pub mod engine;
pub mod error;
pub mod provider;
pub mod render;
pub mod service;
pub mod shim;
pub mod telemetry;

pub use crate::core::{ChartOptions, Viewport};
pub use engine::ChartEngine;
pub use error::{ChartError, ChartResult};
pub use provider::{ProviderBinding, RasterSurfaceProvider, SurfaceProvider};
pub use service::{
    ChartService, ChartServiceConfig, ChartSession, DEFAULT_EXPORT_TIMEOUT, DEFAULT_FONT,
    ImageElement, REQUIRED_CAPABILITIES, RenderCompletion, SERVICE_NAME, SessionState,
};
