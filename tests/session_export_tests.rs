use std::time::Duration;

use chart_snapshot::core::Viewport;
use chart_snapshot::render::{
    ImageFormat, PNG_SIGNATURE, RasterSurface, RenderFrame, RenderStats, Renderer, Surface,
};
use chart_snapshot::shim::ImageDecoder;
use chart_snapshot::{
    ChartError, ChartOptions, ChartResult, ChartService, ChartServiceConfig,
    REQUIRED_CAPABILITIES, RasterSurfaceProvider, RenderCompletion, SERVICE_NAME, SessionState,
    SurfaceProvider,
};
use serde_json::json;
use tokio::time::Instant;

fn start_service() -> ChartService<RasterSurfaceProvider> {
    ChartService::with_provider(ChartServiceConfig::default(), RasterSurfaceProvider::new())
        .expect("service starts")
}

fn bar_options(extra: serde_json::Value) -> ChartOptions {
    let mut options = ChartOptions::from_value(json!({
        "xAxis": { "data": ["a", "b", "c"] },
        "series": [{ "type": "bar", "data": [5, 20, 36] }]
    }))
    .expect("options");
    options.merge_from(&ChartOptions::from_value(extra).expect("extra options"));
    options
}

#[tokio::test(start_paused = true)]
async fn animated_bar_chart_times_out_at_export_deadline() {
    let service = start_service();
    let mut session = service
        .create_chart(400, 300, &bar_options(json!({})))
        .expect("chart");

    let started = Instant::now();
    let element = session
        .export(Duration::from_millis(500))
        .await
        .expect("export");
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(500), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "elapsed {elapsed:?}");
    assert_eq!(session.last_completion(), Some(RenderCompletion::TimedOut));
    assert_eq!(element.mime(), "image/png");
    assert!(element.data().starts_with(&PNG_SIGNATURE));
    assert!(element.is_png());

    let decoded = image::load_from_memory(element.data()).expect("valid png");
    assert_eq!((decoded.width(), decoded.height()), (400, 300));
    service.stop();
}

#[tokio::test(start_paused = true)]
async fn empty_options_never_finish_and_time_out() {
    let service = start_service();
    let mut session = service
        .create_chart(100, 100, &ChartOptions::new())
        .expect("chart");

    let started = Instant::now();
    let element = session
        .export(Duration::from_millis(100))
        .await
        .expect("export");

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(session.last_completion(), Some(RenderCompletion::TimedOut));
    let decoded = image::load_from_memory(element.data()).expect("valid png");
    assert_eq!((decoded.width(), decoded.height()), (100, 100));
}

#[tokio::test(start_paused = true)]
async fn static_chart_exports_without_waiting() {
    let service = start_service();
    let mut session = service
        .create_chart(400, 300, &bar_options(json!({ "animation": false })))
        .expect("chart");

    let started = Instant::now();
    let element = session
        .export(Duration::from_millis(2000))
        .await
        .expect("export");

    assert!(started.elapsed() < Duration::from_millis(1));
    assert_eq!(session.last_completion(), Some(RenderCompletion::Finished));

    let decoded = image::load_from_memory(element.data())
        .expect("valid png")
        .into_rgba8();
    // Inside the third bar, below the first split line.
    assert_eq!(decoded.get_pixel(320, 250).0, [0x54, 0x70, 0xc6, 0xff]);
    // Background corner.
    assert_eq!(decoded.get_pixel(2, 2).0, [0xff, 0xff, 0xff, 0xff]);
}

#[tokio::test(start_paused = true)]
async fn exported_png_contains_the_title_text() {
    let service = start_service();
    let options = ChartOptions::from_value(json!({
        "animation": false,
        "title": { "text": "WWWWWWWWWWWW Revenue" }
    }))
    .expect("options");
    let mut session = service.create_chart(300, 120, &options).expect("chart");

    let element = session
        .export(Duration::from_millis(100))
        .await
        .expect("export");
    assert_eq!(session.last_completion(), Some(RenderCompletion::Finished));

    let decoded = image::load_from_memory(element.data())
        .expect("valid png")
        .into_rgba8();
    let inked = decoded
        .pixels()
        .filter(|px| px.0 != [0xff, 0xff, 0xff, 0xff])
        .count();
    assert!(inked > 0, "title produced a blank image");
}

#[tokio::test(start_paused = true)]
async fn short_animation_finishes_before_timeout() {
    let service = start_service();
    let mut session = service
        .create_chart(320, 240, &bar_options(json!({ "animationDuration": 300 })))
        .expect("chart");

    let started = Instant::now();
    session.export_default().await.expect("export");
    let elapsed = started.elapsed();

    assert_eq!(session.last_completion(), Some(RenderCompletion::Finished));
    assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2000), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn export_disposes_and_second_export_is_rejected() {
    let service = start_service();
    let mut session = service
        .create_chart(200, 150, &bar_options(json!({ "animation": false })))
        .expect("chart");

    session
        .export(Duration::from_millis(50))
        .await
        .expect("first export");
    assert_eq!(session.state(), SessionState::Exported);
    assert!(!session.is_live());

    let err = session
        .export(Duration::from_millis(50))
        .await
        .expect_err("second export");
    assert!(matches!(err, ChartError::SessionClosed { state: "exported" }));
    assert!(matches!(
        session.surface(),
        Err(ChartError::SessionClosed { .. })
    ));
    assert!(!session.dispose());
}

#[tokio::test(start_paused = true)]
async fn dispose_is_idempotent_and_blocks_export() {
    let service = start_service();
    let mut session = service
        .create_chart(120, 80, &bar_options(json!({})))
        .expect("chart");

    let engine = session.engine().expect("live engine").clone();
    assert!(session.dispose());
    assert!(!session.dispose());
    assert!(engine.is_disposed());
    assert_eq!(session.state(), SessionState::Disposed);

    let err = session
        .export(Duration::from_millis(10))
        .await
        .expect_err("export after dispose");
    assert!(matches!(err, ChartError::SessionClosed { state: "disposed" }));
}

#[tokio::test(start_paused = true)]
async fn dropping_a_live_session_disposes_its_engine() {
    let service = start_service();
    let session = service
        .create_chart(120, 80, &bar_options(json!({})))
        .expect("chart");
    let engine = session.engine().expect("live engine").clone();

    drop(session);
    assert!(engine.is_disposed());
}

#[tokio::test(start_paused = true)]
async fn session_surface_matches_requested_size() {
    let service = start_service();
    let session = service
        .create_chart(640, 480, &ChartOptions::new())
        .expect("chart");

    let viewport = session.surface().expect("surface").viewport();
    assert_eq!((viewport.width, viewport.height), (640, 480));
    assert_eq!(session.viewport(), viewport);
}

#[tokio::test(start_paused = true)]
async fn independent_sessions_export_independently() {
    let service = start_service();
    let mut first = service
        .create_chart(200, 100, &bar_options(json!({ "animation": false })))
        .expect("first");
    let mut second = service
        .create_chart(300, 200, &ChartOptions::new())
        .expect("second");

    let (a, b) = tokio::join!(
        first.export(Duration::from_millis(100)),
        second.export(Duration::from_millis(100))
    );
    let a = image::load_from_memory(a.expect("first export").data()).expect("png");
    let b = image::load_from_memory(b.expect("second export").data()).expect("png");

    assert_eq!((a.width(), a.height()), (200, 100));
    assert_eq!((b.width(), b.height()), (300, 200));
    assert_eq!(first.last_completion(), Some(RenderCompletion::Finished));
    assert_eq!(second.last_completion(), Some(RenderCompletion::TimedOut));
}

/// Draws normally but cannot produce PNG bytes.
struct UnencodableSurface(RasterSurface);

impl Renderer for UnencodableSurface {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        self.0.render(frame)
    }
}

impl Surface for UnencodableSurface {
    fn viewport(&self) -> Viewport {
        self.0.viewport()
    }

    fn encode(&self, _format: ImageFormat) -> ChartResult<Vec<u8>> {
        Err(ChartError::Encode("disk full".to_owned()))
    }

    fn stats(&self) -> RenderStats {
        self.0.stats()
    }
}

struct UnencodableProvider(RasterSurfaceProvider);

impl SurfaceProvider for UnencodableProvider {
    type Surface = UnencodableSurface;

    fn name(&self) -> &'static str {
        "unencodable"
    }

    fn create_surface(&self, width: u32, height: u32) -> ChartResult<UnencodableSurface> {
        RasterSurface::new(width, height).map(UnencodableSurface)
    }

    fn image_decoder(&self) -> ImageDecoder {
        self.0.image_decoder()
    }
}

#[tokio::test(start_paused = true)]
async fn encode_failure_still_disposes_the_engine() {
    let service = ChartService::with_provider(
        ChartServiceConfig::default(),
        UnencodableProvider(RasterSurfaceProvider::new()),
    )
    .expect("service");
    let mut session = service
        .create_chart(160, 120, &bar_options(json!({ "animation": false })))
        .expect("chart");
    let engine = session.engine().expect("live engine").clone();

    let err = session
        .export(Duration::from_millis(100))
        .await
        .expect_err("encode fails");
    assert!(matches!(err, ChartError::Encode(ref msg) if msg == "disk full"));
    assert_eq!(session.last_completion(), Some(RenderCompletion::Finished));
    assert!(engine.is_disposed());
    assert_eq!(session.state(), SessionState::Disposed);
    assert!(session.engine().is_err());

    let err = session
        .export(Duration::from_millis(100))
        .await
        .expect_err("second export");
    assert!(matches!(err, ChartError::SessionClosed { state: "disposed" }));
    service.stop();
}

#[test]
fn service_identity_constants() {
    assert_eq!(SERVICE_NAME, "echarts");
    assert_eq!(REQUIRED_CAPABILITIES, &["canvas"]);
}

#[test]
fn zero_sized_chart_is_rejected() {
    let service = start_service();
    let err = service
        .create_chart(0, 300, &ChartOptions::new())
        .expect_err("zero width");
    assert!(matches!(
        err,
        ChartError::InvalidViewport {
            width: 0,
            height: 300
        }
    ));
}

#[test]
fn malformed_series_fails_chart_creation() {
    let service = start_service();
    let options = ChartOptions::from_value(json!({ "series": [{ "type": "pie", "data": [1] }] }))
        .expect("options");
    let err = service
        .create_chart(100, 100, &options)
        .expect_err("unsupported series");
    assert!(matches!(err, ChartError::InvalidOption(_)));
}
