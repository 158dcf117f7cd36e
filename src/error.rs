use thiserror::Error;

/// Library error type for flipbook operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine was built without an overlay host, so labels have nowhere to mount.
    #[error("no overlay host configured; labels cannot be mounted")]
    MissingOverlayHost,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Pixel scaling failed while drawing a frame.
    #[error("render error: {0}")]
    Render(anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
