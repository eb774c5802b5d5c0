use std::fmt;
use std::time::Duration;

use parking_lot::MappedMutexGuard;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::core::Viewport;
use crate::engine::ChartEngine;
use crate::error::{ChartError, ChartResult};
use crate::render::{ImageFormat, Surface};

use super::{DEFAULT_EXPORT_TIMEOUT, ImageElement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Live,
    Exported,
    Disposed,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Exported => "exported",
            Self::Disposed => "disposed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the export race resolved first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCompletion {
    Finished,
    TimedOut,
}

/// One engine/surface pair, owned until exported or disposed.
///
/// Dropping a live session disposes its engine.
pub struct ChartSession<S: Surface> {
    engine: ChartEngine<S>,
    viewport: Viewport,
    state: SessionState,
    last_completion: Option<RenderCompletion>,
}

impl<S: Surface> ChartSession<S> {
    pub(crate) fn new(engine: ChartEngine<S>, viewport: Viewport) -> Self {
        Self {
            engine,
            viewport,
            state: SessionState::Live,
            last_completion: None,
        }
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state == SessionState::Live
    }

    /// Outcome of the export race, once `export` has run.
    #[must_use]
    pub fn last_completion(&self) -> Option<RenderCompletion> {
        self.last_completion
    }

    /// The live engine.
    pub fn engine(&self) -> ChartResult<&ChartEngine<S>> {
        self.ensure_live()?;
        Ok(&self.engine)
    }

    /// The live surface, locked for the guard's lifetime.
    pub fn surface(&self) -> ChartResult<MappedMutexGuard<'_, S>> {
        self.ensure_live()?;
        self.engine.surface()
    }

    /// Releases the engine and surface. Safe to call repeatedly.
    pub fn dispose(&mut self) -> bool {
        if self.state != SessionState::Live {
            return false;
        }
        self.state = SessionState::Disposed;
        self.engine.dispose()
    }

    /// [`export`](Self::export) with the 2000 ms default wait.
    pub async fn export_default(&mut self) -> ChartResult<ImageElement> {
        self.export(DEFAULT_EXPORT_TIMEOUT).await
    }

    /// Waits for the render to finish or `timeout` to pass, whichever comes
    /// first, then encodes the surface as PNG and disposes the engine.
    ///
    /// A timeout is not an error; the image is whatever was drawn so far. The
    /// engine is disposed even when encoding fails.
    pub async fn export(&mut self, timeout: Duration) -> ChartResult<ImageElement> {
        self.ensure_live()?;

        let started = Instant::now();
        let finished = self.engine.on_finished();
        let completion = tokio::select! {
            Ok(()) = finished => RenderCompletion::Finished,
            () = sleep(timeout) => RenderCompletion::TimedOut,
        };
        debug!(
            ?completion,
            elapsed_ms = started.elapsed().as_millis() as u64,
            timeout_ms = timeout.as_millis() as u64,
            "chart export wait resolved"
        );

        let format = ImageFormat::Png;
        let encoded = self.engine.encode(format);
        self.engine.dispose();
        self.last_completion = Some(completion);

        match encoded {
            Ok(data) => {
                self.state = SessionState::Exported;
                debug!(bytes = data.len(), mime = format.mime(), "chart exported");
                Ok(ImageElement::new(data, format.mime()))
            }
            Err(err) => {
                self.state = SessionState::Disposed;
                warn!(error = %err, "chart export failed to encode");
                Err(err)
            }
        }
    }

    fn ensure_live(&self) -> ChartResult<()> {
        if self.state != SessionState::Live {
            return Err(ChartError::SessionClosed {
                state: self.state.as_str(),
            });
        }
        Ok(())
    }
}

impl<S: Surface> Drop for ChartSession<S> {
    fn drop(&mut self) {
        if self.state == SessionState::Live {
            debug!("disposing chart session dropped while live");
            self.engine.dispose();
        }
    }
}

impl<S: Surface> fmt::Debug for ChartSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartSession")
            .field("viewport", &self.viewport)
            .field("state", &self.state)
            .field("last_completion", &self.last_completion)
            .finish()
    }
}
