pub mod model;
pub mod options;
pub mod scale;
pub mod types;

pub use model::{
    ChartModel, GraphicImageModel, RECOGNIZED_OPTION_KEYS, SeriesKind, SeriesModel, TextStyle,
    TitleModel, ensure_recognized_keys,
};
pub use options::ChartOptions;
pub use scale::{LinearScale, NiceExtent, nice_extent};
pub use types::{PixelRect, Viewport};
