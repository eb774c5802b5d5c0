use chart_snapshot::core::{LinearScale, nice_extent};
use chart_snapshot::engine::ChartEngine;
use chart_snapshot::render::{RasterSurface, Surface};
use chart_snapshot::{ChartOptions, ChartService, ChartServiceConfig, RasterSurfaceProvider};
use proptest::prelude::*;
use serde_json::json;

fn sample_value() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        6 => (-5000.0f64..5000.0f64).prop_map(Some),
    ]
}

fn any_finite() -> impl Strategy<Value = f64> {
    prop::num::f64::POSITIVE
        | prop::num::f64::NEGATIVE
        | prop::num::f64::NORMAL
        | prop::num::f64::SUBNORMAL
        | prop::num::f64::ZERO
}

proptest! {
    #[test]
    fn nice_extent_is_finite_over_the_whole_f64_range(
        a in any_finite(),
        b in any_finite(),
        target_ticks in 2usize..12,
    ) {
        let extent = nice_extent(a, b, target_ticks).expect("finite inputs");
        prop_assert!(extent.min.is_finite() && extent.max.is_finite());
        prop_assert!(extent.max > extent.min);
        prop_assert!(extent.step.is_finite() && extent.step > 0.0);
        prop_assert!(extent.ticks.len() >= 2);
        prop_assert!(extent.ticks.iter().all(|tick| tick.is_finite()));

        let scale = LinearScale::new(extent.min, extent.max, 300.0, 0.0).expect("scale");
        for value in [a, b] {
            if (extent.min..=extent.max).contains(&value) {
                prop_assert!(scale.to_pixel(value).expect("pixel").is_finite());
            }
        }
    }

    #[test]
    fn extreme_series_values_render(
        values in prop::collection::vec(any_finite(), 1..6),
        kind in prop_oneof![Just("bar"), Just("line")],
    ) {
        let options = ChartOptions::from_value(json!({
            "animation": false,
            "series": [{ "type": kind, "data": values }]
        }))
        .expect("options");

        let engine = ChartEngine::init(RasterSurface::new(240, 160).expect("surface"));
        engine.set_option(&options).expect("render");
        prop_assert!(engine.is_settled());
        prop_assert!(engine.last_frame().expect("frame").validate().is_ok());
    }

    #[test]
    fn created_surfaces_match_requested_dimensions(width in 1u32..512, height in 1u32..512) {
        let service = ChartService::with_provider(
            ChartServiceConfig::default(),
            RasterSurfaceProvider::new(),
        )
        .expect("service");
        let session = service
            .create_chart(width, height, &ChartOptions::new())
            .expect("chart");

        let viewport = session.surface().expect("surface").viewport();
        prop_assert_eq!((viewport.width, viewport.height), (width, height));
    }

    #[test]
    fn laid_out_frames_are_valid_and_deterministic(
        values in prop::collection::vec(sample_value(), 1..48),
        kind in prop_oneof![Just("bar"), Just("line")],
        width in 48u32..900,
        height in 48u32..600,
    ) {
        let options = ChartOptions::from_value(json!({
            "animation": false,
            "title": { "text": "generated" },
            "series": [{ "type": kind, "data": values }]
        }))
        .expect("options");

        let first = ChartEngine::init(RasterSurface::new(width, height).expect("surface"));
        first.set_option(&options).expect("first render");
        let second = ChartEngine::init(RasterSurface::new(width, height).expect("surface"));
        second.set_option(&options).expect("second render");

        let frame = first.last_frame().expect("frame");
        prop_assert!(frame.validate().is_ok());
        let second_frame = second.last_frame();
        prop_assert_eq!(Some(&frame), second_frame.as_ref());
        prop_assert!(frame.lines.iter().all(|line| line.stroke_width > 0.0));
        prop_assert!(frame.rects.iter().all(|rect| rect.height >= 0.0 && rect.width >= 0.0));
    }

    #[test]
    fn caller_font_always_wins_over_configured_font(
        configured in "[a-z]{3,12}",
        caller in "[A-Z][a-z]{2,12}",
    ) {
        let layered = ChartOptions::layered(
            &configured,
            &ChartOptions::from_value(json!({ "textStyle": { "fontFamily": caller.clone() } }))
                .expect("options"),
        );
        prop_assert_eq!(
            layered.get_path(&["textStyle", "fontFamily"]),
            Some(&json!(caller))
        );
    }
}
