//! Error types for device operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Malformed connection identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl From<reqwest::Error> for DeviceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DeviceError::Timeout(e.to_string())
        } else {
            DeviceError::Connection(e.to_string())
        }
    }
}

impl From<quick_xml::Error> for DeviceError {
    fn from(e: quick_xml::Error) -> Self {
        DeviceError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
