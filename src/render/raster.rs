use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use plotters::prelude::{
    BitMapBackend, DrawingArea, IntoDrawingArea, IntoFont, PathElement, RGBAColor, Rectangle,
    ShapeStyle, TextStyle,
};
use plotters::coord::Shift;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::trace;

use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::render::{
    Color, ImageFormat, ImagePrimitive, LinePrimitive, RectPrimitive, RenderFrame, RenderStats,
    Renderer, Surface, TextHAlign, TextPrimitive,
};

/// Largest edge accepted for a raster surface.
pub const MAX_SURFACE_EDGE_PX: u32 = 16_384;

const FALLBACK_FONT_FAMILY: &str = "sans-serif";

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Pure-Rust RGB surface drawn through `plotters`' bitmap backend.
///
/// Text is rasterized with the system font matching each primitive's family,
/// falling back to the generic sans-serif family. Labels no font can render
/// are counted as skipped in [`RenderStats`]. The buffer starts out white.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    last_stats: RenderStats,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> ChartResult<Self> {
        let viewport = Viewport::new(width, height).validated()?;
        if viewport.width > MAX_SURFACE_EDGE_PX || viewport.height > MAX_SURFACE_EDGE_PX {
            return Err(ChartError::Surface(format!(
                "raster surface {width}x{height} exceeds {MAX_SURFACE_EDGE_PX}px edge limit"
            )));
        }

        Ok(Self {
            width,
            height,
            rgb: vec![255u8; viewport.pixel_count() * 3],
            last_stats: RenderStats::default(),
        })
    }

    /// Raw RGB8 bytes, row-major.
    #[must_use]
    pub fn rgb_bytes(&self) -> &[u8] {
        &self.rgb
    }

    /// Pixel at `(x, y)` as opaque RGBA.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.rgb.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2], 255])
    }
}

impl Renderer for RasterSurface {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        if frame.viewport != self.viewport() {
            return Err(ChartError::InvalidData(format!(
                "frame viewport {}x{} does not match surface {}x{}",
                frame.viewport.width, frame.viewport.height, self.width, self.height
            )));
        }

        let size = (self.width, self.height);
        let area = BitMapBackend::with_buffer(&mut self.rgb, size).into_drawing_area();
        let stats = paint_frame(&area, frame)?;
        area.present()
            .map_err(|err| ChartError::Surface(format!("present error: {err:?}")))?;

        self.last_stats = stats;
        Ok(())
    }
}

impl Surface for RasterSurface {
    fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    fn encode(&self, format: ImageFormat) -> ChartResult<Vec<u8>> {
        let target = match format {
            ImageFormat::Png => image::ImageFormat::Png,
        };
        let image = RgbImage::from_raw(self.width, self.height, self.rgb.clone())
            .ok_or_else(|| ChartError::Encode("image buffer conversion failed".to_owned()))?;
        let mut output = Cursor::new(Vec::new());
        image
            .write_to(&mut output, target)
            .map_err(|err| ChartError::Encode(format!("png encoding error: {err}")))?;
        Ok(output.into_inner())
    }

    fn stats(&self) -> RenderStats {
        self.last_stats
    }
}

fn paint_frame(area: &Area<'_>, frame: &RenderFrame) -> ChartResult<RenderStats> {
    area.fill(&RGBAColor(255, 255, 255, 1.0))
        .map_err(|err| draw_error("background fill", err))?;
    if frame.background.alpha > 0.0 {
        area.fill(&plotters_color(frame.background))
            .map_err(|err| draw_error("background fill", err))?;
    }

    let mut stats = RenderStats::default();
    for rect in &frame.rects {
        draw_rect(area, rect)?;
        stats.rects_drawn += 1;
    }
    for line in &frame.lines {
        draw_line(area, line)?;
        stats.lines_drawn += 1;
    }
    for image in &frame.images {
        draw_image(area, image)?;
        stats.images_drawn += 1;
    }
    for text in &frame.texts {
        if draw_text(area, text) {
            stats.texts_drawn += 1;
        } else {
            stats.texts_skipped += 1;
        }
    }
    Ok(stats)
}

fn draw_rect(area: &Area<'_>, rect: &RectPrimitive) -> ChartResult<()> {
    let Some((x0, x1)) = inclusive_span(rect.x, rect.x + rect.width) else {
        return Ok(());
    };
    let Some((y0, y1)) = inclusive_span(rect.y, rect.y + rect.height) else {
        return Ok(());
    };

    area.draw(&Rectangle::new(
        [(x0, y0), (x1, y1)],
        ShapeStyle {
            color: plotters_color(rect.fill_color),
            filled: true,
            stroke_width: 1,
        },
    ))
    .map_err(|err| draw_error("rect fill", err))?;

    if rect.border_width > 0.0 {
        area.draw(&Rectangle::new(
            [(x0, y0), (x1, y1)],
            ShapeStyle {
                color: plotters_color(rect.border_color),
                filled: false,
                stroke_width: stroke_px(rect.border_width),
            },
        ))
        .map_err(|err| draw_error("rect border", err))?;
    }
    Ok(())
}

fn draw_line(area: &Area<'_>, line: &LinePrimitive) -> ChartResult<()> {
    area.draw(&PathElement::new(
        vec![
            (line.x1.floor() as i32, line.y1.floor() as i32),
            (line.x2.floor() as i32, line.y2.floor() as i32),
        ],
        ShapeStyle {
            color: plotters_color(line.color),
            filled: false,
            stroke_width: stroke_px(line.stroke_width),
        },
    ))
    .map_err(|err| draw_error("line stroke", err))
}

fn draw_image(area: &Area<'_>, primitive: &ImagePrimitive) -> ChartResult<()> {
    let Some((x0, x1)) = inclusive_span(primitive.x, primitive.x + primitive.width) else {
        return Ok(());
    };
    let Some((y0, y1)) = inclusive_span(primitive.y, primitive.y + primitive.height) else {
        return Ok(());
    };

    let source = &primitive.image;
    let source = RgbaImage::from_raw(source.width, source.height, source.rgba.clone())
        .ok_or_else(|| ChartError::InvalidData("image buffer conversion failed".to_owned()))?;
    let scaled = imageops::resize(
        &source,
        (x1 - x0 + 1) as u32,
        (y1 - y0 + 1) as u32,
        FilterType::Nearest,
    );

    for (x, y, px) in scaled.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        area.draw_pixel(
            (x0 + x as i32, y0 + y as i32),
            &RGBAColor(r, g, b, f64::from(a) / 255.0),
        )
        .map_err(|err| draw_error("image blit", err))?;
    }
    Ok(())
}

/// Draws `text` in its own family, then in sans-serif. `false` if neither font loads.
fn draw_text(area: &Area<'_>, text: &TextPrimitive) -> bool {
    let color = plotters_color(text.color);
    let h_pos = match text.h_align {
        TextHAlign::Left => HPos::Left,
        TextHAlign::Center => HPos::Center,
        TextHAlign::Right => HPos::Right,
    };
    let anchor = (text.x.round() as i32, text.y.round() as i32);

    for family in [text.font_family.as_str(), FALLBACK_FONT_FAMILY] {
        let style = TextStyle::from((family, text.font_size_px).into_font())
            .color(&color)
            .pos(Pos::new(h_pos, VPos::Top));
        match area.draw_text(&text.text, &style, anchor) {
            Ok(()) => return true,
            Err(err) => trace!(
                family,
                error = ?err,
                "text font unavailable"
            ),
        }
    }
    false
}

/// Inclusive pixel columns covering the half-open range `[start, end)`.
fn inclusive_span(start: f64, end: f64) -> Option<(i32, i32)> {
    let lo = start.round();
    let hi = end.round() - 1.0;
    if hi < lo || hi < 0.0 || lo > f64::from(MAX_SURFACE_EDGE_PX) {
        return None;
    }
    Some((lo.max(0.0) as i32, hi.min(f64::from(MAX_SURFACE_EDGE_PX)) as i32))
}

fn stroke_px(width: f64) -> u32 {
    width.round().max(1.0) as u32
}

fn plotters_color(color: Color) -> RGBAColor {
    let [r, g, b, _] = color.to_rgba8();
    RGBAColor(r, g, b, color.alpha.clamp(0.0, 1.0))
}

fn draw_error(what: &str, err: impl std::fmt::Debug) -> ChartError {
    ChartError::Surface(format!("{what} error: {err:?}"))
}
