use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{trace, warn};

use crate::render::Surface;

use super::layout::ease_cubic_out;
use super::{EngineShared, FRAME_INTERVAL};

/// Number of frames needed to cover `duration` at [`FRAME_INTERVAL`].
pub(super) fn frame_count(duration: Duration) -> u32 {
    let frames = duration.as_millis().div_ceil(FRAME_INTERVAL.as_millis());
    u32::try_from(frames).unwrap_or(u32::MAX).max(1)
}

/// Draws the entry animation for `generation`, then settles the engine.
///
/// Stops silently once a newer option supersedes it or the engine is disposed.
pub(super) async fn run<S: Surface>(
    shared: Arc<EngineShared<S>>,
    generation: u64,
    duration: Duration,
) {
    let frames = frame_count(duration);
    let mut ticker = interval(FRAME_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    for frame in 1..=frames {
        ticker.tick().await;

        let mut state = shared.state.lock();
        if state.generation != generation || state.is_disposed() {
            trace!(generation, frame, "animation superseded");
            return;
        }

        let progress = ease_cubic_out(f64::from(frame) / f64::from(frames));
        if let Err(err) = state.draw(progress) {
            warn!(
                error = %err,
                generation,
                frame,
                "animation frame failed; chart will not settle"
            );
            state.animation = None;
            return;
        }
        if frame == frames {
            state.settle();
        }
    }
}
