use std::time::Duration;

use serde_json::Value;

use crate::core::ChartOptions;
use crate::core::options::json_kind;
use crate::error::{ChartError, ChartResult};
use crate::render::Color;

/// Palette used when neither the series nor `color` option set a color.
pub const DEFAULT_PALETTE: [&str; 9] = [
    "#5470c6", "#91cc75", "#fac858", "#ee6666", "#73c0de", "#3ba272", "#fc8452", "#9a60b4",
    "#ea7ccc",
];

pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";
pub const DEFAULT_FONT_SIZE_PX: f64 = 12.0;
pub const DEFAULT_TITLE_FONT_SIZE_PX: f64 = 18.0;
pub const DEFAULT_TEXT_COLOR: &str = "#333333";
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(1000);

/// Top-level option keys the engine reads.
pub const RECOGNIZED_OPTION_KEYS: [&str; 9] = [
    "animation",
    "animationDuration",
    "backgroundColor",
    "color",
    "graphic",
    "series",
    "textStyle",
    "title",
    "xAxis",
];

/// Rejects top-level keys outside [`RECOGNIZED_OPTION_KEYS`].
///
/// Lenient parsing ignores such keys; strict callers use this to catch typos.
pub fn ensure_recognized_keys(options: &ChartOptions) -> ChartResult<()> {
    let unknown: Vec<&str> = options
        .as_map()
        .keys()
        .map(String::as_str)
        .filter(|key| !RECOGNIZED_OPTION_KEYS.contains(key))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(ChartError::InvalidOption(format!(
        "unrecognized option keys: {}",
        unknown.join(", ")
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Bar,
    Line,
}

impl SeriesKind {
    fn parse(value: &str) -> ChartResult<Self> {
        match value {
            "bar" => Ok(Self::Bar),
            "line" => Ok(Self::Line),
            other => Err(ChartError::InvalidOption(format!(
                "unsupported series type `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size_px: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleModel {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesModel {
    pub name: Option<String>,
    pub kind: SeriesKind,
    /// `None` entries are gaps.
    pub data: Vec<Option<f64>>,
    pub color: Color,
}

/// Placement of a registered image source.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicImageModel {
    pub source: String,
    pub left: f64,
    pub top: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Typed view of the option subset the engine draws.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub background: Color,
    pub text_style: TextStyle,
    pub title: Option<TitleModel>,
    pub categories: Vec<String>,
    pub series: Vec<SeriesModel>,
    pub graphics: Vec<GraphicImageModel>,
    pub animation: bool,
    pub animation_duration: Duration,
}

impl ChartModel {
    pub fn from_options(options: &ChartOptions) -> ChartResult<Self> {
        let background = match options.get("backgroundColor") {
            Some(value) => parse_color(value, "backgroundColor")?,
            None => Color::WHITE,
        };

        let text_style = parse_text_style(options.get("textStyle"), None, "textStyle")?;

        let title = match options.get("title") {
            None | Some(Value::Null) => None,
            Some(Value::Object(title)) => {
                let text = match title.get("text") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(text)) => Some(text.clone()),
                    Some(other) => {
                        return Err(type_error("title.text", "string", other));
                    }
                };
                match text.filter(|text| !text.is_empty()) {
                    Some(text) => {
                        let mut style = parse_text_style(
                            title.get("textStyle"),
                            Some(&text_style),
                            "title.textStyle",
                        )?;
                        if title
                            .get("textStyle")
                            .and_then(|style| style.get("fontSize"))
                            .is_none()
                        {
                            style.font_size_px = DEFAULT_TITLE_FONT_SIZE_PX;
                        }
                        Some(TitleModel { text, style })
                    }
                    None => None,
                }
            }
            Some(other) => return Err(type_error("title", "object", other)),
        };

        let categories = match options.get_path(&["xAxis", "data"]) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::String(label) => Ok(label.clone()),
                    Value::Number(number) => Ok(number.to_string()),
                    other => Err(type_error(
                        &format!("xAxis.data[{index}]"),
                        "string or number",
                        other,
                    )),
                })
                .collect::<ChartResult<_>>()?,
            Some(other) => return Err(type_error("xAxis.data", "array", other)),
        };

        let palette = parse_palette(options.get("color"))?;
        let series = match options.get("series") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_series(index, item, &palette))
                .collect::<ChartResult<_>>()?,
            Some(item @ Value::Object(_)) => vec![parse_series(0, item, &palette)?],
            Some(other) => return Err(type_error("series", "array", other)),
        };

        let graphics = match options.get("graphic") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_graphic(index, item))
                .collect::<ChartResult<_>>()?,
            Some(other) => return Err(type_error("graphic", "array", other)),
        };

        let animation = match options.get("animation") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => return Err(type_error("animation", "boolean", other)),
        };
        let animation_duration = match options.get("animationDuration") {
            None | Some(Value::Null) => DEFAULT_ANIMATION_DURATION,
            Some(value) => {
                let millis = finite_number(value, "animationDuration")?;
                if millis < 0.0 {
                    return Err(ChartError::InvalidOption(
                        "animationDuration must be >= 0".to_owned(),
                    ));
                }
                Duration::from_millis(millis.round() as u64)
            }
        };

        Ok(Self {
            background,
            text_style,
            title,
            categories,
            series,
            graphics,
            animation,
            animation_duration,
        })
    }

    /// Whether the option declares anything to draw.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.title.is_some() || !self.series.is_empty() || !self.graphics.is_empty()
    }

    /// Number of category slots along the x axis.
    #[must_use]
    pub fn category_count(&self) -> usize {
        self.series
            .iter()
            .map(|series| series.data.len())
            .chain(std::iter::once(self.categories.len()))
            .max()
            .unwrap_or(0)
    }

    /// Min/max over all present data values.
    #[must_use]
    pub fn value_extent(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|series| series.data.iter().flatten().copied())
            .fold(None, |extent, value| match extent {
                None => Some((value, value)),
                Some((min, max)) => Some((f64::min(min, value), f64::max(max, value))),
            })
    }
}

fn parse_series(index: usize, item: &Value, palette: &[Color]) -> ChartResult<SeriesModel> {
    let path = format!("series[{index}]");
    let Value::Object(series) = item else {
        return Err(type_error(&path, "object", item));
    };

    let kind = match series.get("type") {
        Some(Value::String(kind)) => SeriesKind::parse(kind)?,
        Some(other) => return Err(type_error(&format!("{path}.type"), "string", other)),
        None => {
            return Err(ChartError::InvalidOption(format!(
                "{path}.type is required"
            )));
        }
    };

    let name = match series.get("name") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => return Err(type_error(&format!("{path}.name"), "string", other)),
    };

    let data = match series.get("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => values
            .iter()
            .enumerate()
            .map(|(slot, value)| match value {
                Value::Null => Ok(None),
                other => finite_number(other, &format!("{path}.data[{slot}]")).map(Some),
            })
            .collect::<ChartResult<_>>()?,
        Some(other) => return Err(type_error(&format!("{path}.data"), "array", other)),
    };

    let color = match series.get("color") {
        None | Some(Value::Null) => palette[index % palette.len()],
        Some(value) => parse_color(value, &format!("{path}.color"))?,
    };

    Ok(SeriesModel {
        name,
        kind,
        data,
        color,
    })
}

fn parse_graphic(index: usize, item: &Value) -> ChartResult<GraphicImageModel> {
    let path = format!("graphic[{index}]");
    let Value::Object(graphic) = item else {
        return Err(type_error(&path, "object", item));
    };

    match graphic.get("type") {
        Some(Value::String(kind)) if kind == "image" => {}
        Some(Value::String(kind)) => {
            return Err(ChartError::InvalidOption(format!(
                "{path}.type `{kind}` is not supported"
            )));
        }
        Some(other) => return Err(type_error(&format!("{path}.type"), "string", other)),
        None => {
            return Err(ChartError::InvalidOption(format!(
                "{path}.type is required"
            )));
        }
    }

    let source = match graphic.get("image") {
        Some(Value::String(source)) if !source.is_empty() => source.clone(),
        Some(other) => {
            return Err(type_error(&format!("{path}.image"), "non-empty string", other));
        }
        None => {
            return Err(ChartError::InvalidOption(format!(
                "{path}.image is required"
            )));
        }
    };

    let optional = |key: &str| -> ChartResult<Option<f64>> {
        match graphic.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => finite_number(value, &format!("{path}.{key}")).map(Some),
        }
    };
    let width = optional("width")?;
    let height = optional("height")?;
    if width.is_some_and(|w| w <= 0.0) || height.is_some_and(|h| h <= 0.0) {
        return Err(ChartError::InvalidOption(format!(
            "{path} width/height must be > 0"
        )));
    }

    Ok(GraphicImageModel {
        source,
        left: optional("left")?.unwrap_or(0.0),
        top: optional("top")?.unwrap_or(0.0),
        width,
        height,
    })
}

fn parse_text_style(
    value: Option<&Value>,
    inherit: Option<&TextStyle>,
    path: &str,
) -> ChartResult<TextStyle> {
    let mut style = match inherit {
        Some(parent) => parent.clone(),
        None => TextStyle {
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            font_size_px: DEFAULT_FONT_SIZE_PX,
            color: Color::parse_css(DEFAULT_TEXT_COLOR)?,
        },
    };

    let style_map = match value {
        None | Some(Value::Null) => return Ok(style),
        Some(Value::Object(map)) => map,
        Some(other) => return Err(type_error(path, "object", other)),
    };

    match style_map.get("fontFamily") {
        None | Some(Value::Null) => {}
        Some(Value::String(family)) if !family.trim().is_empty() => {
            style.font_family = family.clone();
        }
        Some(other) => {
            return Err(type_error(
                &format!("{path}.fontFamily"),
                "non-blank string",
                other,
            ));
        }
    }
    if let Some(size) = style_map.get("fontSize").filter(|v| !v.is_null()) {
        let size = finite_number(size, &format!("{path}.fontSize"))?;
        if size <= 0.0 {
            return Err(ChartError::InvalidOption(format!(
                "{path}.fontSize must be > 0"
            )));
        }
        style.font_size_px = size;
    }
    if let Some(color) = style_map.get("color").filter(|v| !v.is_null()) {
        style.color = parse_color(color, &format!("{path}.color"))?;
    }

    Ok(style)
}

fn parse_palette(value: Option<&Value>) -> ChartResult<Vec<Color>> {
    match value {
        None | Some(Value::Null) => DEFAULT_PALETTE.iter().map(|c| Color::parse_css(c)).collect(),
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_color(item, &format!("color[{index}]")))
            .collect(),
        Some(other) => Err(type_error("color", "non-empty array", other)),
    }
}

fn parse_color(value: &Value, path: &str) -> ChartResult<Color> {
    match value {
        Value::String(css) => Color::parse_css(css)
            .map_err(|err| ChartError::InvalidOption(format!("{path}: {err}"))),
        other => Err(type_error(path, "color string", other)),
    }
}

fn finite_number(value: &Value, path: &str) -> ChartResult<f64> {
    match value.as_f64() {
        Some(number) if number.is_finite() => Ok(number),
        _ => Err(type_error(path, "finite number", value)),
    }
}

fn type_error(path: &str, expected: &str, found: &Value) -> ChartError {
    ChartError::InvalidOption(format!(
        "{path} must be a {expected}, got {}",
        json_kind(found)
    ))
}
