use std::sync::Arc;

use tracing::trace;

use crate::core::{
    ChartModel, GraphicImageModel, LinearScale, PixelRect, SeriesKind, SeriesModel, Viewport,
    nice_extent,
};
use crate::error::ChartResult;
use crate::render::{
    Color, ImagePrimitive, LinePrimitive, RectPrimitive, RenderFrame, TextHAlign, TextPrimitive,
};
use crate::shim::DecodedImage;

const GRID_LEFT_PX: f64 = 56.0;
const GRID_RIGHT_PX: f64 = 24.0;
const GRID_TOP_PX: f64 = 24.0;
const GRID_BOTTOM_PX: f64 = 36.0;
const TITLE_TOP_PX: f64 = 8.0;
const AXIS_LABEL_GAP_PX: f64 = 8.0;
const VALUE_TICK_TARGET: usize = 5;
const BAR_GROUP_RATIO: f64 = 0.6;
const LINE_STROKE_PX: f64 = 2.0;
const LINE_SYMBOL_PX: f64 = 4.0;

const AXIS_COLOR: Color = Color::rgb(0.43, 0.44, 0.48);
const SPLIT_LINE_COLOR: Color = Color::rgb(0.88, 0.90, 0.94);

/// Decoded image bound to its option placement.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedGraphic {
    pub placement: GraphicImageModel,
    pub image: Arc<DecodedImage>,
}

/// Cubic ease-out used for entry animation progress.
#[must_use]
pub(crate) fn ease_cubic_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Lays out one frame with data values interpolated from the baseline by `progress`.
pub(crate) fn build_frame(
    model: &ChartModel,
    viewport: Viewport,
    graphics: &[ResolvedGraphic],
    progress: f64,
) -> ChartResult<RenderFrame> {
    let progress = progress.clamp(0.0, 1.0);
    let width = f64::from(viewport.width);
    let height = f64::from(viewport.height);
    let mut frame = RenderFrame::new(viewport).with_background(model.background);

    let mut plot_top = GRID_TOP_PX;
    if let Some(title) = &model.title {
        frame.texts.push(TextPrimitive::new(
            title.text.clone(),
            width / 2.0,
            TITLE_TOP_PX,
            title.style.font_family.clone(),
            title.style.font_size_px,
            title.style.color,
            TextHAlign::Center,
        ));
        plot_top += TITLE_TOP_PX + title.style.font_size_px;
    }

    if !model.series.is_empty() {
        let plot = PixelRect::new(
            GRID_LEFT_PX,
            plot_top,
            width - GRID_LEFT_PX - GRID_RIGHT_PX,
            height - plot_top - GRID_BOTTOM_PX,
        );
        if plot.is_drawable() {
            layout_cartesian(&mut frame, model, plot, progress)?;
        } else {
            trace!(
                width = viewport.width,
                height = viewport.height,
                "surface too small for cartesian grid"
            );
        }
    }

    for graphic in graphics {
        let placement = &graphic.placement;
        frame.images.push(ImagePrimitive::new(
            placement.left,
            placement.top,
            placement
                .width
                .unwrap_or_else(|| f64::from(graphic.image.width)),
            placement
                .height
                .unwrap_or_else(|| f64::from(graphic.image.height)),
            Arc::clone(&graphic.image),
        ));
    }

    Ok(frame)
}

fn layout_cartesian(
    frame: &mut RenderFrame,
    model: &ChartModel,
    plot: PixelRect,
    progress: f64,
) -> ChartResult<()> {
    let style = &model.text_style;
    let (data_min, data_max) = model.value_extent().unwrap_or((0.0, 0.0));
    let extent = nice_extent(data_min.min(0.0), data_max.max(0.0), VALUE_TICK_TARGET)?;
    let y_scale = LinearScale::new(extent.min, extent.max, plot.bottom(), plot.y)?;
    let baseline_value = 0.0_f64.clamp(extent.min, extent.max);
    let baseline_y = y_scale.to_pixel(baseline_value)?;

    for tick in &extent.ticks {
        let y = y_scale.to_pixel(*tick)?;
        frame.lines.push(LinePrimitive::new(
            plot.x,
            y,
            plot.right(),
            y,
            1.0,
            SPLIT_LINE_COLOR,
        ));
        frame.texts.push(TextPrimitive::new(
            format_tick(*tick, extent.step),
            plot.x - AXIS_LABEL_GAP_PX,
            y - style.font_size_px / 2.0,
            style.font_family.clone(),
            style.font_size_px,
            style.color,
            TextHAlign::Right,
        ));
    }
    frame.lines.push(LinePrimitive::new(
        plot.x,
        baseline_y,
        plot.right(),
        baseline_y,
        1.0,
        AXIS_COLOR,
    ));

    let slots = model.category_count().max(1);
    let band = plot.width / slots as f64;
    let band_center = |index: usize| plot.x + band * (index as f64 + 0.5);

    for (index, label) in model.categories.iter().enumerate() {
        if label.is_empty() {
            continue;
        }
        frame.texts.push(TextPrimitive::new(
            label.clone(),
            band_center(index),
            plot.bottom() + AXIS_LABEL_GAP_PX / 2.0,
            style.font_family.clone(),
            style.font_size_px,
            style.color,
            TextHAlign::Center,
        ));
    }

    let animate = |value: f64| -> ChartResult<f64> {
        y_scale.to_pixel(baseline_value + (value - baseline_value) * progress)
    };

    let bars: Vec<&SeriesModel> = model
        .series
        .iter()
        .filter(|series| series.kind == SeriesKind::Bar)
        .collect();
    if !bars.is_empty() {
        let group_width = band * BAR_GROUP_RATIO;
        let bar_width = group_width / bars.len() as f64;
        let group_offset = (band - group_width) / 2.0;
        for (slot, series) in bars.iter().enumerate() {
            for (index, value) in series.data.iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                let y = animate(*value)?;
                frame.rects.push(RectPrimitive::new(
                    plot.x + band * index as f64 + group_offset + bar_width * slot as f64,
                    y.min(baseline_y),
                    bar_width,
                    (y - baseline_y).abs(),
                    series.color,
                ));
            }
        }
    }

    for series in model
        .series
        .iter()
        .filter(|series| series.kind == SeriesKind::Line)
    {
        let mut previous: Option<(f64, f64)> = None;
        for (index, value) in series.data.iter().enumerate() {
            let Some(value) = value else {
                previous = None;
                continue;
            };
            let point = (band_center(index), animate(*value)?);
            if let Some((x, y)) = previous {
                frame.lines.push(LinePrimitive::new(
                    x,
                    y,
                    point.0,
                    point.1,
                    LINE_STROKE_PX,
                    series.color,
                ));
            }
            frame.rects.push(
                RectPrimitive::new(
                    point.0 - LINE_SYMBOL_PX / 2.0,
                    point.1 - LINE_SYMBOL_PX / 2.0,
                    LINE_SYMBOL_PX,
                    LINE_SYMBOL_PX,
                    Color::WHITE,
                )
                .with_border(1.0, series.color),
            );
            previous = Some(point);
        }
    }

    Ok(())
}

fn format_tick(value: f64, step: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    if value.abs() >= 1e15 || step < 1e-9 {
        return if value == 0.0 {
            "0".to_owned()
        } else {
            format!("{value:.2e}")
        };
    }
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil().max(0.0) as usize
    };
    format!("{value:.decimals$}")
}
