use std::sync::Arc;

use approx::assert_relative_eq;
use chart_snapshot::core::Viewport;
use chart_snapshot::render::{
    Color, ImageFormat, ImagePrimitive, LinePrimitive, PNG_SIGNATURE, RasterSurface,
    RectPrimitive, RenderFrame, Renderer, Surface, TextHAlign, TextPrimitive,
};
use chart_snapshot::ChartError;
use chart_snapshot::shim::DecodedImage;

#[test]
fn raster_surface_rejects_zero_and_oversized_dimensions() {
    assert!(matches!(
        RasterSurface::new(0, 10),
        Err(ChartError::InvalidViewport { .. })
    ));
    assert!(matches!(
        RasterSurface::new(20_000, 10),
        Err(ChartError::Surface(_))
    ));
}

#[test]
fn fresh_surface_encodes_white_png() {
    let surface = RasterSurface::new(8, 4).expect("surface");
    let png = surface.encode(ImageFormat::Png).expect("encode");
    assert!(png.starts_with(&PNG_SIGNATURE));

    let decoded = image::load_from_memory(&png).expect("decode").into_rgba8();
    assert_eq!(decoded.dimensions(), (8, 4));
    assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255, 255]);
}

#[test]
fn frame_primitives_land_on_expected_pixels() {
    let mut surface = RasterSurface::new(40, 40).expect("surface");
    let frame = RenderFrame::new(Viewport::new(40, 40))
        .with_background(Color::WHITE)
        .with_rect(RectPrimitive::new(4.0, 4.0, 10.0, 10.0, Color::from_rgb8(0, 0, 255)))
        .with_line(LinePrimitive::new(0.0, 30.5, 40.0, 30.5, 1.0, Color::BLACK))
        .with_image(ImagePrimitive::new(
            20.0,
            4.0,
            4.0,
            4.0,
            Arc::new(DecodedImage::new(1, 1, vec![255, 0, 0, 255]).expect("image")),
        ))
        .with_text(TextPrimitive::new(
            "label",
            20.0,
            20.0,
            "sans",
            12.0,
            Color::BLACK,
            TextHAlign::Left,
        ));

    surface.render(&frame).expect("render");

    assert_eq!(surface.pixel(8, 8), Some([0, 0, 255, 255]));
    assert_eq!(surface.pixel(10, 30), Some([0, 0, 0, 255]));
    assert_eq!(surface.pixel(21, 5), Some([255, 0, 0, 255]));
    assert_eq!(surface.pixel(35, 10), Some([255, 255, 255, 255]));

    let stats = surface.stats();
    assert_eq!(stats.rects_drawn, 1);
    assert_eq!(stats.lines_drawn, 1);
    assert_eq!(stats.images_drawn, 1);
    assert_eq!(stats.texts_drawn + stats.texts_skipped, 1);
}

#[test]
fn text_is_rasterized_into_the_buffer() {
    let mut surface = RasterSurface::new(200, 40).expect("surface");
    let frame = RenderFrame::new(Viewport::new(200, 40))
        .with_background(Color::WHITE)
        .with_text(TextPrimitive::new(
            "WWWWWW Revenue",
            100.0,
            8.0,
            "sans-serif",
            18.0,
            Color::BLACK,
            TextHAlign::Center,
        ));
    surface.render(&frame).expect("render");

    assert_eq!(surface.stats().texts_drawn, 1);
    let inked = (0..200)
        .flat_map(|x| (0..40).map(move |y| (x, y)))
        .filter(|&(x, y)| surface.pixel(x, y) != Some([255, 255, 255, 255]))
        .count();
    assert!(inked > 0, "title left no pixels");
}

#[test]
fn unknown_family_falls_back_to_sans_serif() {
    let mut surface = RasterSurface::new(120, 30).expect("surface");
    let frame = RenderFrame::new(Viewport::new(120, 30)).with_text(TextPrimitive::new(
        "fallback",
        4.0,
        4.0,
        "no-such-family-anywhere",
        14.0,
        Color::BLACK,
        TextHAlign::Left,
    ));
    surface.render(&frame).expect("render");

    let stats = surface.stats();
    assert_eq!(stats.texts_drawn, 1);
    assert_eq!(stats.texts_skipped, 0);
}

#[test]
fn frame_with_mismatched_viewport_is_rejected() {
    let mut surface = RasterSurface::new(10, 10).expect("surface");
    let err = surface
        .render(&RenderFrame::new(Viewport::new(20, 10)))
        .expect_err("viewport mismatch");
    assert!(matches!(err, ChartError::InvalidData(_)));
}

#[test]
fn half_transparent_fill_blends_over_background() {
    let mut surface = RasterSurface::new(4, 4).expect("surface");
    let frame = RenderFrame::new(Viewport::new(4, 4))
        .with_background(Color::WHITE)
        .with_rect(RectPrimitive::new(0.0, 0.0, 4.0, 4.0, Color::rgba(0.0, 0.0, 0.0, 0.5)));
    surface.render(&frame).expect("render");

    let [r, g, b, a] = surface.pixel(1, 1).expect("pixel");
    assert_eq!(a, 255);
    assert_relative_eq!(f64::from(r), 127.0, epsilon = 1.5);
    assert_eq!(r, g);
    assert_eq!(g, b);
}
