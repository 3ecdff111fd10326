//! Error types for the jewelry tracking library

use thiserror::Error;

use crate::motion::ObjectClass;

/// Result type alias for the tracking library
pub type Result<T> = std::result::Result<T, TrackError>;

/// Errors raised outside the per-frame tracking core.
///
/// Assignment itself never fails: an empty frame is the normal
/// "nothing found" path and is handled without an error.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid motion profile for {class}: {reason}")]
    InvalidProfile { class: ObjectClass, reason: String },

    #[error("no object classes configured")]
    NoClasses,

    #[cfg(feature = "vision")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[cfg(feature = "vision")]
    #[error("video source error: {0}")]
    Video(String),
}

impl TrackError {
    pub fn invalid_profile<S: Into<String>>(class: ObjectClass, reason: S) -> Self {
        Self::InvalidProfile {
            class,
            reason: reason.into(),
        }
    }
}
