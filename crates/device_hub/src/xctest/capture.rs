//! Screenshot through libimobiledevice, bypassing WebDriverAgent

use async_trait::async_trait;
use image::DynamicImage;
use std::time::Duration;
use tempfile::tempdir;
use tokio::process::Command;
use tracing::debug;

use super::ScreenCapture;
use crate::config::Config;
use crate::error::{DeviceError, Result};

/// `idevicescreenshot` wrapper
#[derive(Debug, Clone)]
pub struct IdeviceScreenshot {
    tool_path: String,
    timeout: Duration,
}

impl IdeviceScreenshot {
    /// Capture from the first attached device
    pub fn new(config: &Config) -> Self {
        Self {
            tool_path: config.backend.idevicescreenshot_path.clone(),
            timeout: config.timing.screenshot(),
        }
    }
}

#[async_trait]
impl ScreenCapture for IdeviceScreenshot {
    async fn capture(&self) -> Result<DynamicImage> {
        // Use a temp directory so the file doesn't exist until the tool writes it
        let temp_dir = tempdir()?;
        let temp_path = temp_dir.path().join("screenshot.png");

        let mut cmd = Command::new(&self.tool_path);
        cmd.arg(&temp_path).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                DeviceError::Timeout(format!(
                    "{} timed out after {}s",
                    self.tool_path,
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| DeviceError::Capture(format!("cannot run {}: {}", self.tool_path, e)))?;

        if !output.status.success() {
            return Err(DeviceError::Capture(format!(
                "{} failed: {}",
                self.tool_path,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Older iOS versions write TIFF regardless of the extension
        let bytes = tokio::fs::read(&temp_path).await?;
        debug!("{} wrote {} bytes", self.tool_path, bytes.len());
        Ok(image::load_from_memory(&bytes)?)
    }
}
