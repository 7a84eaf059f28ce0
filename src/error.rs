use std::io;
use std::path::PathBuf;

use crate::codec::FourCc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to open capture device: {0}")]
    DeviceOpen(String),

    #[error("Capture device is already open")]
    AlreadyOpen,

    #[error("Failed to open video writer for {} with codec {codec}", path.display())]
    EncoderOpen { path: PathBuf, codec: FourCc },

    #[error("Codec {0} is usable neither natively nor through the external encoder")]
    CodecUnavailable(FourCc),

    #[error("External encoder error: {0}")]
    Subprocess(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Resize error: {0}")]
    Resize(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
