use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid chart option: {0}")]
    InvalidOption(String),

    #[error("invalid service config: {0}")]
    InvalidConfig(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("image decoding failed: {0}")]
    Decode(String),

    #[error("no image decoder is installed in the process-wide slot")]
    DecoderUnavailable,

    #[error("chart engine has been disposed")]
    EngineDisposed,

    #[error("chart session is no longer live (state: {state})")]
    SessionClosed { state: &'static str },
}
