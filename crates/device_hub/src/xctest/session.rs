//! Seams between the iOS adapter and its backends

use async_trait::async_trait;
use image::DynamicImage;
use serde_json::Value;

use crate::error::Result;

/// A WebDriverAgent session
#[async_trait]
pub trait WdaSession: Send + Sync {
    fn base_url(&self) -> &str;

    /// Points-to-pixels factor of the main screen
    fn scale(&self) -> f64;

    async fn screenshot(&self) -> Result<DynamicImage>;

    /// Accessibility tree as returned by `source?format=json`
    async fn source(&self) -> Result<Value>;

    /// Window size in points
    async fn window_size(&self) -> Result<(u32, u32)>;

    async fn close(&self) -> Result<()>;
}

/// Screen capture that does not go through WebDriverAgent
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self) -> Result<DynamicImage>;
}
