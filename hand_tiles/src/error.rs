//! Top-level error type.
//!
//! Only start-up failures surface as [`AppError`].  Anything that goes wrong
//! while the frame loop runs (detector dies, audio device rejects a stream)
//! is logged and the feature goes quiet.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("cannot read config {path}: {source}")]
    ConfigIo {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path:   PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("window: {0}")]
    Window(#[from] minifb::Error),

    #[error("detector: {0}")]
    Detector(String),

    #[error("audio: {0}")]
    Audio(String),

    #[error("music file {path}: {source}")]
    Music {
        path:   PathBuf,
        #[source]
        source: hound::Error,
    },
}
