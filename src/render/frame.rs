use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::render::{Color, ImagePrimitive, LinePrimitive, RectPrimitive, TextPrimitive};

/// Backend-agnostic scene for one chart draw pass.
///
/// Backends paint `background` first, then rects, lines, images and texts in
/// that order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub background: Color,
    pub lines: Vec<LinePrimitive>,
    pub rects: Vec<RectPrimitive>,
    pub texts: Vec<TextPrimitive>,
    pub images: Vec<ImagePrimitive>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            background: Color::WHITE,
            lines: Vec::new(),
            rects: Vec::new(),
            texts: Vec::new(),
            images: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    #[must_use]
    pub fn with_line(mut self, line: LinePrimitive) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: TextPrimitive) -> Self {
        self.texts.push(text);
        self
    }

    #[must_use]
    pub fn with_rect(mut self, rect: RectPrimitive) -> Self {
        self.rects.push(rect);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: ImagePrimitive) -> Self {
        self.images.push(image);
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }

        self.background.validate()?;
        for line in &self.lines {
            line.validate()?;
        }
        for rect in &self.rects {
            rect.validate()?;
        }
        for text in &self.texts {
            text.validate()?;
        }
        for image in &self.images {
            image.validate()?;
        }

        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
            && self.rects.is_empty()
            && self.texts.is_empty()
            && self.images.is_empty()
    }

    /// Font families referenced by text primitives, in first-seen order.
    #[must_use]
    pub fn font_families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = Vec::new();
        for text in &self.texts {
            if !families.contains(&text.font_family.as_str()) {
                families.push(&text.font_family);
            }
        }
        families
    }
}
