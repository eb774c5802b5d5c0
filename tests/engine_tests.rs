use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chart_snapshot::core::Viewport;
use chart_snapshot::engine::{FINISHED_EVENT, default_options};
use chart_snapshot::render::{
    ImageFormat, RasterSurface, RenderFrame, RenderStats, Renderer, Surface,
};
use chart_snapshot::{ChartEngine, ChartError, ChartOptions};
use serde_json::json;
use tokio::time::{Instant, sleep};

fn engine(width: u32, height: u32) -> ChartEngine<RasterSurface> {
    ChartEngine::init(RasterSurface::new(width, height).expect("surface"))
}

fn options(value: serde_json::Value) -> ChartOptions {
    ChartOptions::from_value(value).expect("options")
}

fn line_chart(duration_ms: u64) -> ChartOptions {
    options(json!({
        "animationDuration": duration_ms,
        "xAxis": { "data": ["q1", "q2", "q3", "q4"] },
        "series": [{ "type": "line", "data": [1.5, null, 4.0, 2.5] }]
    }))
}

#[test]
fn init_seeds_engine_defaults() {
    let engine = engine(80, 60);
    assert_eq!(engine.options(), default_options());
    assert!(!engine.is_settled());
    assert!(engine.last_frame().is_none());
    assert_eq!(engine.render_passes(), 0);
}

#[test]
fn static_option_renders_once_and_settles() {
    let engine = engine(200, 120);
    engine
        .set_option(&options(json!({
            "animation": false,
            "series": [{ "type": "bar", "data": [1, 2] }]
        })))
        .expect("set option");

    assert!(engine.is_settled());
    assert_eq!(engine.render_passes(), 1);
    let stats = engine.stats().expect("stats");
    assert_eq!(stats.rects_drawn, 2);
    assert!(stats.lines_drawn > 0);
}

#[test]
fn animated_option_without_runtime_draws_final_frame() {
    let engine = engine(200, 120);
    engine.set_option(&line_chart(800)).expect("set option");

    assert!(engine.is_settled());
    assert_eq!(engine.render_passes(), 1);
}

#[test]
fn invalid_option_keeps_previous_state() {
    let engine = engine(200, 120);
    engine
        .set_option(&options(json!({ "animation": false, "title": { "text": "ok" } })))
        .expect("first option");
    let before = engine.options();

    let err = engine
        .set_option(&options(json!({ "backgroundColor": "not-a-color" })))
        .expect_err("bad color");
    assert!(matches!(err, ChartError::InvalidOption(_)));
    assert_eq!(engine.options(), before);
    assert!(engine.is_settled());
}

/// Raster surface whose draw pass fails while `broken` is set.
struct FlakySurface {
    inner: RasterSurface,
    broken: Arc<AtomicBool>,
}

impl Renderer for FlakySurface {
    fn render(&mut self, frame: &RenderFrame) -> chart_snapshot::ChartResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(ChartError::Surface("device lost".to_owned()));
        }
        self.inner.render(frame)
    }
}

impl Surface for FlakySurface {
    fn viewport(&self) -> Viewport {
        self.inner.viewport()
    }

    fn encode(&self, format: ImageFormat) -> chart_snapshot::ChartResult<Vec<u8>> {
        self.inner.encode(format)
    }

    fn stats(&self) -> RenderStats {
        self.inner.stats()
    }
}

#[test]
fn failed_draw_keeps_previous_option_and_frame() {
    let broken = Arc::new(AtomicBool::new(false));
    let engine = ChartEngine::init(FlakySurface {
        inner: RasterSurface::new(200, 120).expect("surface"),
        broken: Arc::clone(&broken),
    });
    engine
        .set_option(&options(json!({
            "animation": false,
            "series": [{ "type": "bar", "data": [1, 2] }]
        })))
        .expect("first option");
    let options_before = engine.options();
    let frame_before = engine.last_frame();
    let passes_before = engine.render_passes();

    broken.store(true, Ordering::SeqCst);
    let err = engine
        .set_option(&options(json!({ "title": { "text": "lost" } })))
        .expect_err("draw fails");
    assert!(matches!(err, ChartError::Surface(_)));

    assert_eq!(engine.options(), options_before);
    assert_eq!(engine.last_frame(), frame_before);
    assert_eq!(engine.render_passes(), passes_before);
    assert!(engine.is_settled());

    broken.store(false, Ordering::SeqCst);
    engine
        .set_option(&options(json!({ "title": { "text": "back" } })))
        .expect("recovers");
    assert_eq!(engine.render_passes(), passes_before + 1);
}

#[test]
fn extreme_magnitudes_render_with_finite_geometry() {
    for data in [json!([1.7e308, -1.7e308]), json!([1e-320]), json!([f64::MAX, f64::MIN])] {
        for kind in ["bar", "line"] {
            let engine = engine(240, 160);
            engine
                .set_option(&options(json!({
                    "animation": false,
                    "series": [{ "type": kind, "data": data.clone() }]
                })))
                .unwrap_or_else(|err| panic!("{kind} {data}: {err}"));

            let frame = engine.last_frame().expect("frame");
            assert!(frame.validate().is_ok(), "{kind} {data}");
            assert!(engine.is_settled());
        }
    }
}

#[test]
fn successive_options_merge_deeply() {
    let engine = engine(200, 120);
    engine
        .set_option(&options(json!({ "animation": false, "textStyle": { "fontFamily": "serif" } })))
        .expect("first");
    engine
        .set_option(&options(json!({ "textStyle": { "fontSize": 16 } })))
        .expect("second");

    let merged = engine.options();
    assert_eq!(
        merged.get_path(&["textStyle", "fontFamily"]),
        Some(&json!("serif"))
    );
    assert_eq!(merged.get_path(&["textStyle", "fontSize"]), Some(&json!(16)));
}

#[test]
fn unknown_event_name_is_rejected() {
    let engine = engine(10, 10);
    assert!(engine.on(FINISHED_EVENT).is_ok());
    assert!(matches!(
        engine.on("rendered"),
        Err(ChartError::InvalidOption(_))
    ));
}

#[test]
fn dispose_releases_surface_once() {
    let engine = engine(40, 40);
    let clone = engine.clone();

    assert!(engine.dispose());
    assert!(!clone.dispose());
    assert!(clone.is_disposed());
    assert!(matches!(
        clone.set_option(&ChartOptions::new()),
        Err(ChartError::EngineDisposed)
    ));
    assert!(matches!(
        clone.encode(chart_snapshot::render::ImageFormat::Png),
        Err(ChartError::EngineDisposed)
    ));
    assert!(matches!(clone.surface(), Err(ChartError::EngineDisposed)));
}

#[tokio::test(start_paused = true)]
async fn animation_settles_after_duration() {
    let engine = engine(320, 200);
    let started = Instant::now();
    engine.set_option(&line_chart(160)).expect("set option");
    assert!(!engine.is_settled());
    assert_eq!(engine.render_passes(), 1);

    engine
        .on(FINISHED_EVENT)
        .expect("subscribe")
        .await
        .expect("finished fires");

    assert!(engine.is_settled());
    assert!(started.elapsed() >= Duration::from_millis(160));
    // Initial frame plus ten animation frames.
    assert_eq!(engine.render_passes(), 11);
}

#[tokio::test(start_paused = true)]
async fn late_subscribers_see_completed_render() {
    let engine = engine(120, 80);
    engine.set_option(&line_chart(32)).expect("set option");
    sleep(Duration::from_millis(100)).await;

    assert!(engine.is_settled());
    let started = Instant::now();
    engine.on_finished().await.expect("already finished");
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn new_option_supersedes_running_animation() {
    let engine = engine(320, 200);
    engine.set_option(&line_chart(1000)).expect("first");
    let first = engine.on_finished();

    sleep(Duration::from_millis(100)).await;
    engine
        .set_option(&options(json!({ "animation": false })))
        .expect("second");

    // The first observer is still pending; the static redraw settles it.
    first.await.expect("settled by second option");
    let passes = engine.render_passes();
    sleep(Duration::from_millis(2000)).await;
    assert_eq!(engine.render_passes(), passes);
}

#[tokio::test(start_paused = true)]
async fn dispose_drops_pending_observers() {
    let engine = engine(120, 80);
    engine.set_option(&line_chart(1000)).expect("set option");
    let pending = engine.on_finished();

    engine.dispose();
    assert!(pending.await.is_err());
}

#[tokio::test(start_paused = true)]
async fn empty_option_never_finishes() {
    let engine = engine(100, 100);
    engine.set_option(&ChartOptions::new()).expect("set option");

    let finished = engine.on_finished();
    let outcome = tokio::time::timeout(Duration::from_millis(500), finished).await;
    assert!(outcome.is_err());
    assert_eq!(engine.render_passes(), 0);
}
