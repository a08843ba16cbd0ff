//! Infrastructure errors
//!
//! Protocol outcomes are [`crate::message::ResponseCode`] values and never
//! show up here.

use thiserror::Error;

/// Failure at the codec boundary
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty payload")]
    EmptyPayload,
}

/// Failure loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure of the async session driver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Response channel closed")]
    ResponseChannelClosed,

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}
