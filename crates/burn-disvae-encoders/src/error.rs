//! Error types for encoder construction and lookup

use thiserror::Error;

use crate::config::ImageSize;

/// Errors raised while resolving, configuring or running an encoder
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("Unknown encoder '{name}' (known: {known})")]
    UnknownEncoder { name: String, known: String },

    #[error("Invalid encoder config: {0}")]
    InvalidConfig(String),

    #[error("{model} does not support image size {size} (supported: {supported})")]
    UnsupportedImageSize {
        model: String,
        size: ImageSize,
        supported: String,
    },

    #[error("Input shape mismatch: expected [batch, {expected}], got {actual:?}")]
    InputShape {
        expected: ImageSize,
        actual: [usize; 4],
    },

    #[error("Invalid image size '{0}': expected C,H,W")]
    ParseImageSize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
