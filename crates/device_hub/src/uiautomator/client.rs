//! JSON-RPC client for the uiautomator2 on-device server

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageBuffer, Rgb};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adb::AdbClient;
use crate::config::Config;
use crate::device::ForegroundApp;
use crate::error::{DeviceError, Result};

/// Size of the blank placeholder when the device reports a zero window size
pub const DEFAULT_BLANK_SIZE: (u32, u32) = (1080, 2400);

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Subset of the `deviceInfo` RPC result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct U2DeviceInfo {
    pub display_width: u32,
    pub display_height: u32,
    #[serde(default)]
    pub current_package_name: Option<String>,
    #[serde(default)]
    pub sdk_int: Option<u32>,
}

/// Black image used in place of screens Android refuses to capture
pub fn blank_screenshot(width: u32, height: u32) -> DynamicImage {
    let black: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(width, height, Rgb([0, 0, 0]));
    DynamicImage::ImageRgb8(black)
}

/// Session with a uiautomator2 server, either by URL or through an ADB port forward
pub struct UiAutomatorClient {
    base_url: String,
    http: reqwest::Client,
    adb: Option<AdbClient>,
    forwarded_port: Mutex<Option<u16>>,
    request_id: AtomicU64,
    fallback_to_blank_screenshot: AtomicBool,
}

impl UiAutomatorClient {
    /// Connect to `address`: an `http(s)://` server URL, or a device serial (empty for the sole device)
    pub async fn connect(address: &str, config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timing.http())
            .build()?;

        let (base_url, adb, forwarded_port) =
            if address.starts_with("http://") || address.starts_with("https://") {
                (address.trim_end_matches('/').to_string(), None, None)
            } else {
                let adb = AdbClient::connect(address, config).await?;
                let port = adb.forward(config.backend.uiautomator_device_port).await?;
                debug!(
                    "forwarded localhost:{} to {}:{}",
                    port,
                    adb.serial(),
                    config.backend.uiautomator_device_port
                );
                (format!("http://127.0.0.1:{}", port), Some(adb), Some(port))
            };

        let client = Self {
            base_url,
            http,
            adb,
            forwarded_port: Mutex::new(forwarded_port),
            request_id: AtomicU64::new(1),
            fallback_to_blank_screenshot: AtomicBool::new(false),
        };

        if let Err(e) = client.ping().await {
            if let Err(close_err) = client.close().await {
                warn!("releasing {} after failed ping failed: {}", client.base_url, close_err);
            }
            return Err(e);
        }

        info!("uiautomator2 server ready at {}", client.base_url);
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// ADB session backing this client, when connected by serial
    pub fn adb(&self) -> Option<&AdbClient> {
        self.adb.as_ref()
    }

    pub fn fallback_to_blank_screenshot(&self) -> bool {
        self.fallback_to_blank_screenshot.load(Ordering::Relaxed)
    }

    /// Return a blank image instead of failing when the screen cannot be captured
    pub fn set_fallback_to_blank_screenshot(&self, enabled: bool) {
        self.fallback_to_blank_screenshot
            .store(enabled, Ordering::Relaxed);
    }

    async fn ping(&self) -> Result<()> {
        let body = self
            .http
            .get(format!("{}/ping", self.base_url))
            .send()
            .await?
            .text()
            .await?;

        if body.trim() == "pong" {
            Ok(())
        } else {
            Err(DeviceError::Connection(format!(
                "uiautomator2 server at {} answered {:?}",
                self.base_url,
                body.trim()
            )))
        }
    }

    /// Invoke a JSON-RPC method and return its result
    pub async fn jsonrpc(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self
            .http
            .post(format!("{}/jsonrpc/0", self.base_url))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(DeviceError::CommandFailed(format!(
                "{} failed ({}): {}",
                method, err.code, err.message
            )));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    pub async fn device_info(&self) -> Result<U2DeviceInfo> {
        let info = self.jsonrpc("deviceInfo", json!([])).await?;
        Ok(serde_json::from_value(info)?)
    }

    /// Capture the screen.
    ///
    /// With the blank fallback enabled, a capture the server answers but refuses
    /// (no image data, or an RPC error) becomes a black image of the window size.
    /// Transport failures are returned unchanged either way.
    pub async fn screenshot(&self) -> Result<DynamicImage> {
        match self.take_screenshot().await {
            Err(e @ (DeviceError::Capture(_) | DeviceError::CommandFailed(_)))
                if self.fallback_to_blank_screenshot() =>
            {
                warn!("screen capture refused, returning blank image: {}", e);
                let (width, height) = match self.window_size().await? {
                    (0, _) | (_, 0) => DEFAULT_BLANK_SIZE,
                    size => size,
                };
                Ok(blank_screenshot(width, height))
            }
            other => other,
        }
    }

    async fn take_screenshot(&self) -> Result<DynamicImage> {
        let result = self.jsonrpc("takeScreenshot", json!([1, 80])).await?;
        let encoded = result
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DeviceError::Capture("server returned no image".to_string()))?;

        let bytes = general_purpose::STANDARD.decode(encoded)?;
        Ok(image::load_from_memory(&bytes)?)
    }

    /// Raw uiautomator XML, uncompressed
    pub async fn dump_hierarchy(&self) -> Result<String> {
        let result = self
            .jsonrpc("dumpWindowHierarchy", json!([false, 50]))
            .await?;
        match result {
            Value::String(xml) if !xml.is_empty() => Ok(xml),
            other => Err(DeviceError::CommandFailed(format!(
                "dumpWindowHierarchy returned {}",
                other
            ))),
        }
    }

    pub async fn window_size(&self) -> Result<(u32, u32)> {
        let info = self.device_info().await?;
        Ok((info.display_width, info.display_height))
    }

    /// Foreground app; the activity is only known when an ADB session backs the client
    pub async fn app_current(&self) -> Result<ForegroundApp> {
        if let Some(adb) = &self.adb {
            return adb.app_current().await;
        }

        let package = self
            .device_info()
            .await?
            .current_package_name
            .ok_or_else(|| DeviceError::CommandFailed("no current package".to_string()))?;
        Ok(ForegroundApp {
            package,
            activity: String::new(),
        })
    }

    /// Drop the ADB port forward, if this client created one
    pub async fn close(&self) -> Result<()> {
        let port = self.forwarded_port.lock().await.take();
        if let (Some(port), Some(adb)) = (port, &self.adb) {
            debug!("removing forward localhost:{}", port);
            adb.remove_forward(port).await?;
        }
        Ok(())
    }
}
