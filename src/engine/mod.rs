//! Stateful charting engine bound to one drawing surface.
//!
//! The engine keeps the merged option, lays it out into a [`RenderFrame`] and
//! draws it onto its surface, either at once or as a short entry animation on
//! a Tokio task. Observers registered with [`ChartEngine::on_finished`] are
//! told when the current option has been fully drawn.

mod animation;
mod layout;

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use smallvec::SmallVec;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::core::{ChartModel, ChartOptions, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{ImageFormat, RenderFrame, RenderStats, Surface};
use crate::shim;

use layout::ResolvedGraphic;

/// Name of the completion event, as hosts spell it.
pub const FINISHED_EVENT: &str = "finished";

/// Interval between animation frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Handle to a charting engine instance.
///
/// Clones share the same engine; disposing through any clone disposes all.
pub struct ChartEngine<S: Surface> {
    shared: Arc<EngineShared<S>>,
}

impl<S: Surface> Clone for ChartEngine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

pub(crate) struct EngineShared<S: Surface> {
    state: Mutex<EngineState<S>>,
}

pub(crate) struct EngineState<S: Surface> {
    surface: Option<S>,
    viewport: Viewport,
    options: ChartOptions,
    model: Option<ChartModel>,
    graphics: Vec<ResolvedGraphic>,
    image_sources: IndexMap<String, Vec<u8>>,
    last_frame: Option<RenderFrame>,
    generation: u64,
    settled: bool,
    passes: u64,
    observers: SmallVec<[oneshot::Sender<()>; 2]>,
    animation: Option<JoinHandle<()>>,
}

impl<S: Surface> EngineState<S> {
    fn draw(&mut self, progress: f64) -> ChartResult<()> {
        let Some(model) = self.model.as_ref() else {
            return Ok(());
        };
        let surface = self.surface.as_mut().ok_or(ChartError::EngineDisposed)?;
        let frame = layout::build_frame(model, self.viewport, &self.graphics, progress)?;
        surface.render(&frame)?;
        self.last_frame = Some(frame);
        self.passes += 1;
        Ok(())
    }

    fn settle(&mut self) {
        self.settled = true;
        self.animation = None;
        let observers = self.observers.len();
        for observer in self.observers.drain(..) {
            let _ = observer.send(());
        }
        debug!(
            generation = self.generation,
            passes = self.passes,
            observers,
            "chart render finished"
        );
    }

    fn is_disposed(&self) -> bool {
        self.surface.is_none()
    }
}

impl<S: Surface> ChartEngine<S> {
    /// Binds a new engine to `surface`, seeded with the engine default option.
    pub fn init(surface: S) -> Self {
        let viewport = surface.viewport();
        trace!(
            width = viewport.width,
            height = viewport.height,
            "chart engine init"
        );
        Self {
            shared: Arc::new(EngineShared {
                state: Mutex::new(EngineState {
                    surface: Some(surface),
                    viewport,
                    options: default_options(),
                    model: None,
                    graphics: Vec::new(),
                    image_sources: IndexMap::new(),
                    last_frame: None,
                    generation: 0,
                    settled: false,
                    passes: 0,
                    observers: SmallVec::new(),
                    animation: None,
                }),
            }),
        }
    }

    /// Merges `options` into the current option and schedules a render.
    ///
    /// The first frame is drawn before anything is committed, so an option
    /// that fails to parse, decode or draw leaves the previous option, frame
    /// and completion state in place.
    pub fn set_option(&self, options: &ChartOptions) -> ChartResult<()> {
        let mut state = self.shared.state.lock();
        if state.is_disposed() {
            return Err(ChartError::EngineDisposed);
        }

        let merged = state.options.merged_with(options);
        let model = ChartModel::from_options(&merged)?;
        let graphics = resolve_graphics(&model, &state.image_sources)?;
        let has_content = model.has_content();
        let duration = model.animation_duration;
        let runtime = if has_content && model.animation && !duration.is_zero() {
            let runtime = tokio::runtime::Handle::try_current().ok();
            if runtime.is_none() {
                trace!("no tokio runtime; drawing final frame synchronously");
            }
            runtime
        } else {
            None
        };

        let first_frame = if has_content {
            let progress = if runtime.is_some() { 0.0 } else { 1.0 };
            let frame = layout::build_frame(&model, state.viewport, &graphics, progress)?;
            let surface = state.surface.as_mut().ok_or(ChartError::EngineDisposed)?;
            surface.render(&frame)?;
            Some(frame)
        } else {
            None
        };

        if let Some(running) = state.animation.take() {
            running.abort();
        }
        state.options = merged;
        state.graphics = graphics;
        state.model = Some(model);
        state.generation += 1;
        state.settled = false;
        let generation = state.generation;

        debug!(
            generation,
            has_content,
            animate = runtime.is_some(),
            duration_ms = duration.as_millis() as u64,
            "chart option set"
        );

        let Some(frame) = first_frame else {
            return Ok(());
        };
        state.last_frame = Some(frame);
        state.passes += 1;

        match runtime {
            Some(runtime) => {
                let shared = Arc::clone(&self.shared);
                state.animation = Some(runtime.spawn(animation::run(
                    shared, generation, duration,
                )));
            }
            None => state.settle(),
        }
        Ok(())
    }

    /// Registers a one-shot observer for the completion event.
    ///
    /// Resolves immediately when the current option has already settled. The
    /// sender is dropped without firing if the engine is disposed first.
    pub fn on_finished(&self) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.shared.state.lock();
        if state.is_disposed() {
            return receiver;
        }
        if state.settled {
            let _ = sender.send(());
        } else {
            state.observers.push(sender);
        }
        receiver
    }

    /// Host-style event subscription. Only [`FINISHED_EVENT`] is emitted.
    pub fn on(&self, event: &str) -> ChartResult<oneshot::Receiver<()>> {
        match event {
            FINISHED_EVENT => Ok(self.on_finished()),
            other => Err(ChartError::InvalidOption(format!(
                "unknown engine event `{other}`"
            ))),
        }
    }

    /// Releases the surface and stops any pending animation.
    ///
    /// Returns `false` when the engine was already disposed.
    pub fn dispose(&self) -> bool {
        let mut state = self.shared.state.lock();
        let Some(surface) = state.surface.take() else {
            return false;
        };
        if let Some(running) = state.animation.take() {
            running.abort();
        }
        state.observers.clear();
        state.model = None;
        state.graphics.clear();
        state.image_sources.clear();
        drop(surface);
        debug!(
            generation = state.generation,
            passes = state.passes,
            "chart engine disposed"
        );
        true
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().is_disposed()
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.shared.state.lock().settled
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.shared.state.lock().viewport
    }

    /// The merged option currently applied.
    #[must_use]
    pub fn options(&self) -> ChartOptions {
        self.shared.state.lock().options.clone()
    }

    /// Frame drawn by the most recent render pass.
    #[must_use]
    pub fn last_frame(&self) -> Option<RenderFrame> {
        self.shared.state.lock().last_frame.clone()
    }

    #[must_use]
    pub fn render_passes(&self) -> u64 {
        self.shared.state.lock().passes
    }

    pub fn stats(&self) -> ChartResult<RenderStats> {
        let state = self.shared.state.lock();
        state
            .surface
            .as_ref()
            .map(S::stats)
            .ok_or(ChartError::EngineDisposed)
    }

    /// Stores raw image bytes that `graphic` entries can reference by name.
    ///
    /// Bytes are decoded on the next `set_option` through the process-wide
    /// decoder slot.
    pub fn register_image(&self, name: impl Into<String>, bytes: Vec<u8>) -> ChartResult<()> {
        let mut state = self.shared.state.lock();
        if state.is_disposed() {
            return Err(ChartError::EngineDisposed);
        }
        state.image_sources.insert(name.into(), bytes);
        Ok(())
    }

    /// Encodes the current surface contents.
    pub fn encode(&self, format: ImageFormat) -> ChartResult<Vec<u8>> {
        let state = self.shared.state.lock();
        let surface = state.surface.as_ref().ok_or(ChartError::EngineDisposed)?;
        surface.encode(format)
    }

    /// Locks the engine and borrows its surface.
    ///
    /// Hold the guard briefly; animation frames wait on the same lock.
    pub fn surface(&self) -> ChartResult<MappedMutexGuard<'_, S>> {
        MutexGuard::try_map(self.shared.state.lock(), |state| state.surface.as_mut())
            .map_err(|_| ChartError::EngineDisposed)
    }
}

impl<S: Surface> std::fmt::Debug for ChartEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ChartEngine")
            .field("viewport", &state.viewport)
            .field("generation", &state.generation)
            .field("settled", &state.settled)
            .field("disposed", &state.is_disposed())
            .finish()
    }
}

/// Engine-side defaults, the lowest option layer.
#[must_use]
pub fn default_options() -> ChartOptions {
    let mut options = ChartOptions::new();
    options.insert(
        "textStyle",
        serde_json::json!({
            "fontFamily": crate::core::model::DEFAULT_FONT_FAMILY,
            "fontSize": crate::core::model::DEFAULT_FONT_SIZE_PX,
            "color": crate::core::model::DEFAULT_TEXT_COLOR,
        }),
    );
    options.insert("animation", serde_json::Value::Bool(true));
    options.insert(
        "animationDuration",
        serde_json::json!(crate::core::model::DEFAULT_ANIMATION_DURATION.as_millis() as u64),
    );
    options
}

fn resolve_graphics(
    model: &ChartModel,
    sources: &IndexMap<String, Vec<u8>>,
) -> ChartResult<Vec<ResolvedGraphic>> {
    model
        .graphics
        .iter()
        .map(|placement| {
            let bytes = sources.get(&placement.source).ok_or_else(|| {
                ChartError::InvalidOption(format!(
                    "graphic image `{}` is not registered",
                    placement.source
                ))
            })?;
            let image = shim::decode_with_installed(bytes)?;
            Ok(ResolvedGraphic {
                placement: placement.clone(),
                image: Arc::new(image),
            })
        })
        .collect()
}
