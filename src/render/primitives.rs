use std::sync::Arc;

use crate::error::{ChartError, ChartResult};
use crate::shim::DecodedImage;

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    #[must_use]
    pub fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self::rgb(
            f64::from(red) / 255.0,
            f64::from(green) / 255.0,
            f64::from(blue) / 255.0,
        )
    }

    /// Parses the CSS color forms used in chart options.
    ///
    /// Supports `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` and a handful of named colors.
    pub fn parse_css(input: &str) -> ChartResult<Self> {
        let value = input.trim().to_ascii_lowercase();
        let invalid = || ChartError::InvalidOption(format!("unsupported color `{input}`"));

        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }
        if let Some(body) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_function(body).ok_or_else(invalid);
        }

        match value.as_str() {
            "transparent" => Ok(Self::TRANSPARENT),
            "white" => Ok(Self::WHITE),
            "black" => Ok(Self::BLACK),
            "red" => Ok(Self::from_rgb8(255, 0, 0)),
            "green" => Ok(Self::from_rgb8(0, 128, 0)),
            "blue" => Ok(Self::from_rgb8(0, 0, 255)),
            "gray" | "grey" => Ok(Self::from_rgb8(128, 128, 128)),
            _ => Err(invalid()),
        }
    }

    #[must_use]
    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |value: f64| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            channel(self.red),
            channel(self.green),
            channel(self.blue),
            channel(self.alpha),
        ]
    }

    pub fn validate(self) -> ChartResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let nibble = |index: usize| u8::from_str_radix(hex.get(index..index + 1)?, 16).ok();
    let byte = |index: usize| u8::from_str_radix(hex.get(index..index + 2)?, 16).ok();

    match hex.len() {
        3 => Some(Color::from_rgb8(
            nibble(0)? * 17,
            nibble(1)? * 17,
            nibble(2)? * 17,
        )),
        6 => Some(Color::from_rgb8(byte(0)?, byte(2)?, byte(4)?)),
        8 => {
            let base = Color::from_rgb8(byte(0)?, byte(2)?, byte(4)?);
            Some(Color {
                alpha: f64::from(byte(6)?) / 255.0,
                ..base
            })
        }
        _ => None,
    }
}

fn parse_rgb_function(body: &str) -> Option<Color> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let mut channels = [0.0; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        let value: f64 = part.parse().ok()?;
        if !(0.0..=255.0).contains(&value) {
            return None;
        }
        *slot = value / 255.0;
    }
    let alpha = match parts.get(3) {
        Some(part) => part.parse::<f64>().ok().filter(|a| (0.0..=1.0).contains(a))?,
        None => 1.0,
    };

    Some(Color::rgba(channels[0], channels[1], channels[2], alpha))
}

/// Draw command for one line segment in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePrimitive {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke_width: f64,
    pub color: Color,
}

impl LinePrimitive {
    #[must_use]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64, stroke_width: f64, color: Color) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            stroke_width,
            color,
        }
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.x1.is_finite()
            || !self.y1.is_finite()
            || !self.x2.is_finite()
            || !self.y2.is_finite()
        {
            return Err(ChartError::InvalidData(
                "line coordinates must be finite".to_owned(),
            ));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(ChartError::InvalidData(
                "line stroke width must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}

/// Draw command for one filled rectangle with optional border.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPrimitive {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill_color: Color,
    pub border_width: f64,
    pub border_color: Color,
}

impl RectPrimitive {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64, fill_color: Color) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill_color,
            border_width: 0.0,
            border_color: Color::TRANSPARENT,
        }
    }

    #[must_use]
    pub fn with_border(mut self, border_width: f64, border_color: Color) -> Self {
        self.border_width = border_width;
        self.border_color = border_color;
        self
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.x.is_finite()
            || !self.y.is_finite()
            || !self.width.is_finite()
            || !self.height.is_finite()
        {
            return Err(ChartError::InvalidData(
                "rect geometry must be finite".to_owned(),
            ));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(ChartError::InvalidData(
                "rect size must be >= 0".to_owned(),
            ));
        }
        if !self.border_width.is_finite() || self.border_width < 0.0 {
            return Err(ChartError::InvalidData(
                "rect border width must be finite and >= 0".to_owned(),
            ));
        }
        self.fill_color.validate()?;
        self.border_color.validate()
    }
}

/// Horizontal text alignment relative to `TextPrimitive::x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextHAlign {
    Left,
    Center,
    Right,
}

/// Draw command for one label in pixel space.
///
/// `y` is the top edge of the text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrimitive {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_family: String,
    pub font_size_px: f64,
    pub color: Color,
    pub h_align: TextHAlign,
}

impl TextPrimitive {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        x: f64,
        y: f64,
        font_family: impl Into<String>,
        font_size_px: f64,
        color: Color,
        h_align: TextHAlign,
    ) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_family: font_family.into(),
            font_size_px,
            color,
            h_align,
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.text.is_empty() {
            return Err(ChartError::InvalidData(
                "text primitive must not be empty".to_owned(),
            ));
        }
        if self.font_family.trim().is_empty() {
            return Err(ChartError::InvalidData(
                "text font family must not be blank".to_owned(),
            ));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ChartError::InvalidData(
                "text coordinates must be finite".to_owned(),
            ));
        }
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "font size must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}

/// Draw command placing decoded pixels into a destination rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePrimitive {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub image: Arc<DecodedImage>,
}

impl ImagePrimitive {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64, image: Arc<DecodedImage>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            image,
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.x.is_finite()
            || !self.y.is_finite()
            || !self.width.is_finite()
            || !self.height.is_finite()
        {
            return Err(ChartError::InvalidData(
                "image geometry must be finite".to_owned(),
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ChartError::InvalidData(
                "image destination size must be > 0".to_owned(),
            ));
        }
        self.image.validate()
    }
}
