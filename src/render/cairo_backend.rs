use cairo::{Context, Format, ImageSurface};
use pango::FontDescription;

use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::render::{
    Color, ImageFormat, ImagePrimitive, RenderFrame, RenderStats, Renderer, Surface, TextHAlign,
};
use crate::shim::DecodedImage;

/// Cairo + Pango + PangoCairo surface.
///
/// Cairo surfaces are not `Send`, so pixels are kept as an owned ARGB32
/// buffer between passes and a transient `ImageSurface` is created for each
/// draw and encode.
#[derive(Debug, Clone)]
pub struct CairoSurface {
    viewport: Viewport,
    stride: i32,
    argb: Vec<u8>,
    last_stats: RenderStats,
}

impl CairoSurface {
    pub fn new(width: u32, height: u32) -> ChartResult<Self> {
        let viewport = Viewport::new(width, height).validated()?;
        let (_, h) = cairo_size(viewport)?;
        let stride = Format::ARgb32
            .stride_for_width(viewport.width)
            .map_err(|err| map_backend_error("failed to compute cairo stride", err))?;

        Ok(Self {
            viewport,
            stride,
            argb: vec![0; stride as usize * h as usize],
            last_stats: RenderStats::default(),
        })
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        "cairo+pango+pangocairo"
    }

    fn transient_surface(&self) -> ChartResult<ImageSurface> {
        let (w, h) = cairo_size(self.viewport)?;
        ImageSurface::create_for_data(self.argb.clone(), Format::ARgb32, w, h, self.stride)
            .map_err(|err| map_backend_error("failed to wrap cairo pixels", err))
    }

    fn draw(&mut self, context: &Context, frame: &RenderFrame) -> ChartResult<RenderStats> {
        apply_color(context, frame.background);
        context.set_operator(cairo::Operator::Source);
        context
            .paint()
            .map_err(|err| map_backend_error("failed to clear surface", err))?;
        context.set_operator(cairo::Operator::Over);

        let mut stats = RenderStats::default();

        for rect in &frame.rects {
            context.rectangle(rect.x, rect.y, rect.width, rect.height);
            apply_color(context, rect.fill_color);
            if rect.border_width > 0.0 {
                context
                    .fill_preserve()
                    .map_err(|err| map_backend_error("failed to fill rectangle", err))?;
                apply_color(context, rect.border_color);
                context.set_line_width(rect.border_width);
                context
                    .stroke()
                    .map_err(|err| map_backend_error("failed to stroke rectangle border", err))?;
            } else {
                context
                    .fill()
                    .map_err(|err| map_backend_error("failed to fill rectangle", err))?;
            }
            stats.rects_drawn += 1;
        }

        for line in &frame.lines {
            apply_color(context, line.color);
            context.set_line_width(line.stroke_width);
            context.move_to(line.x1, line.y1);
            context.line_to(line.x2, line.y2);
            context
                .stroke()
                .map_err(|err| map_backend_error("failed to stroke line", err))?;
            stats.lines_drawn += 1;
        }

        for image in &frame.images {
            paint_image(context, image)?;
            stats.images_drawn += 1;
        }

        for text in &frame.texts {
            let layout = pangocairo::functions::create_layout(context);
            let mut font_description = FontDescription::new();
            font_description.set_family(&text.font_family);
            font_description.set_absolute_size(text.font_size_px * f64::from(pango::SCALE));
            layout.set_font_description(Some(&font_description));
            layout.set_text(&text.text);

            let (text_width, _text_height) = layout.pixel_size();
            let x = match text.h_align {
                TextHAlign::Left => text.x,
                TextHAlign::Center => text.x - f64::from(text_width) / 2.0,
                TextHAlign::Right => text.x - f64::from(text_width),
            };

            apply_color(context, text.color);
            context.move_to(x, text.y);
            pangocairo::functions::show_layout(context, &layout);
            stats.texts_drawn += 1;
        }

        Ok(stats)
    }
}

impl Renderer for CairoSurface {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        if frame.viewport != self.viewport {
            return Err(ChartError::InvalidData(format!(
                "frame viewport {}x{} does not match surface {}x{}",
                frame.viewport.width,
                frame.viewport.height,
                self.viewport.width,
                self.viewport.height
            )));
        }

        let mut surface = self.transient_surface()?;
        let stats = {
            let context = Context::new(&surface)
                .map_err(|err| map_backend_error("failed to create cairo context", err))?;
            self.draw(&context, frame)?
        };
        surface.flush();
        let data = surface
            .data()
            .map_err(|err| ChartError::Surface(format!("failed to read cairo pixels: {err}")))?;
        self.argb.clear();
        self.argb.extend_from_slice(&data);

        self.last_stats = stats;
        Ok(())
    }
}

impl Surface for CairoSurface {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn encode(&self, format: ImageFormat) -> ChartResult<Vec<u8>> {
        match format {
            ImageFormat::Png => {
                let surface = self.transient_surface()?;
                let mut output = Vec::new();
                surface
                    .write_to_png(&mut output)
                    .map_err(|err| ChartError::Encode(format!("cairo png encoding error: {err}")))?;
                Ok(output)
            }
        }
    }

    fn stats(&self) -> RenderStats {
        self.last_stats
    }
}

/// Decodes PNG bytes through Cairo into straight-alpha RGBA.
pub fn decode_png_with_cairo(bytes: &[u8]) -> ChartResult<DecodedImage> {
    let mut reader = std::io::Cursor::new(bytes);
    let mut surface = ImageSurface::create_from_png(&mut reader)
        .map_err(|err| ChartError::Decode(format!("cairo png decode error: {err}")))?;
    let format = surface.format();
    let width = u32::try_from(surface.width())
        .map_err(|_| ChartError::Decode("negative cairo image width".to_owned()))?;
    let height = u32::try_from(surface.height())
        .map_err(|_| ChartError::Decode("negative cairo image height".to_owned()))?;
    let stride = surface.stride() as usize;
    let data = surface
        .data()
        .map_err(|err| ChartError::Decode(format!("failed to read decoded pixels: {err}")))?;

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for row in 0..height as usize {
        let line = &data[row * stride..row * stride + width as usize * 4];
        for px in line.chunks_exact(4) {
            let argb = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
            let alpha = match format {
                Format::Rgb24 => 255,
                _ => (argb >> 24) as u8,
            };
            let unpremultiply = |channel: u32| -> u8 {
                let channel = (channel & 0xff) as u8;
                if alpha == 0 || alpha == 255 {
                    channel
                } else {
                    ((u32::from(channel) * 255 + u32::from(alpha) / 2) / u32::from(alpha)).min(255)
                        as u8
                }
            };
            rgba.extend_from_slice(&[
                unpremultiply(argb >> 16),
                unpremultiply(argb >> 8),
                unpremultiply(argb),
                alpha,
            ]);
        }
    }

    DecodedImage::new(width, height, rgba)
}

fn paint_image(context: &Context, image: &ImagePrimitive) -> ChartResult<()> {
    let source = &image.image;
    let stride = Format::ARgb32
        .stride_for_width(source.width)
        .map_err(|err| map_backend_error("failed to compute image stride", err))?;
    let mut argb = vec![0u8; stride as usize * source.height as usize];
    for y in 0..source.height {
        for x in 0..source.width {
            let Some([r, g, b, a]) = source.pixel(x, y) else {
                continue;
            };
            let premultiply = |channel: u8| (u32::from(channel) * u32::from(a) + 127) / 255;
            let value =
                (u32::from(a) << 24) | (premultiply(r) << 16) | (premultiply(g) << 8) | premultiply(b);
            let offset = y as usize * stride as usize + x as usize * 4;
            argb[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
        }
    }

    let width = i32::try_from(source.width)
        .map_err(|_| ChartError::InvalidData("image too wide for cairo".to_owned()))?;
    let height = i32::try_from(source.height)
        .map_err(|_| ChartError::InvalidData("image too tall for cairo".to_owned()))?;
    let pattern_surface = ImageSurface::create_for_data(argb, Format::ARgb32, width, height, stride)
        .map_err(|err| map_backend_error("failed to wrap image pixels", err))?;

    context
        .save()
        .map_err(|err| map_backend_error("failed to save cairo state", err))?;
    context.translate(image.x, image.y);
    context.scale(
        image.width / f64::from(source.width),
        image.height / f64::from(source.height),
    );
    context
        .set_source_surface(&pattern_surface, 0.0, 0.0)
        .map_err(|err| map_backend_error("failed to set image source", err))?;
    context
        .paint()
        .map_err(|err| map_backend_error("failed to paint image", err))?;
    context
        .restore()
        .map_err(|err| map_backend_error("failed to restore cairo state", err))
}

fn cairo_size(viewport: Viewport) -> ChartResult<(i32, i32)> {
    let width = i32::try_from(viewport.width).map_err(|_| ChartError::InvalidViewport {
        width: viewport.width,
        height: viewport.height,
    })?;
    let height = i32::try_from(viewport.height).map_err(|_| ChartError::InvalidViewport {
        width: viewport.width,
        height: viewport.height,
    })?;
    Ok((width, height))
}

fn apply_color(context: &Context, color: Color) {
    context.set_source_rgba(color.red, color.green, color.blue, color.alpha);
}

fn map_backend_error(prefix: &str, err: cairo::Error) -> ChartError {
    ChartError::Surface(format!("{prefix}: {err}"))
}
