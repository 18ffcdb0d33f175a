use thiserror::Error;

/// Engine error type.
///
/// Every fallible engine operation returns this. Host applications usually wrap it
/// in `anyhow` at their boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported renderer `{0}`")]
    UnsupportedRenderer(String),

    #[error("unsupported tone mapper `{0}`")]
    UnsupportedToneMapper(String),

    #[error("animation output type ({0}) not supported")]
    UnsupportedExportType(String),

    /// A resource was used or destroyed after it had already been destroyed.
    #[error("{0} used after destroy")]
    Destroyed(&'static str),

    #[error("{buffer} has no attachment {index}")]
    MissingAttachment {
        buffer: &'static str,
        index: usize,
    },

    #[error("resolution must be positive, got {0}")]
    InvalidResolution(u32),

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("parameter `{name}` expects a {expected} value")]
    ParameterType {
        name: String,
        expected: &'static str,
    },

    #[error("shader program `{0}` not found")]
    MissingProgram(String),

    #[error("shader mixin `{0}` not found")]
    MissingMixin(String),

    #[error("volume: {0}")]
    Volume(String),

    #[error("environment map: {0}")]
    Environment(String),

    #[error("invalid animation options: {0}")]
    InvalidAnimation(String),

    #[error("gpu: {0}")]
    Gpu(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
