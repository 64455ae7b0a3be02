//! HTTP client for WebDriverAgent

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::WdaSession;
use crate::config::Config;
use crate::error::{DeviceError, Result};

/// One WebDriverAgent session
pub struct WdaClient {
    base_url: String,
    http: reqwest::Client,
    session_id: String,
    scale: f64,
    closed: AtomicBool,
}

/// Pull the `value` out of a WDA reply, turning error payloads into errors
pub fn unwrap_value(status: reqwest::StatusCode, mut body: Value) -> Result<Value> {
    let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    let error = value.get("error").and_then(Value::as_str);
    if !status.is_success() || error.is_some() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .or(error)
            .unwrap_or("unknown error");
        return Err(DeviceError::CommandFailed(format!(
            "WebDriverAgent {}: {}",
            status, message
        )));
    }
    Ok(value)
}

impl WdaClient {
    /// Open a session. An empty address uses the configured default URL.
    pub async fn connect(address: &str, config: &Config) -> Result<Self> {
        let base_url = if address.is_empty() {
            config.backend.default_wda_url.clone()
        } else {
            address.to_string()
        };
        let base_url = base_url.trim_end_matches('/').to_string();
        info!("ios connect: {}", base_url);

        let http = reqwest::Client::builder()
            .timeout(config.timing.http())
            .build()?;

        let status = request(&http, Method::GET, &format!("{}/status", base_url), None).await?;
        debug!("WebDriverAgent status: {}", status);

        let session = http
            .post(format!("{}/session", base_url))
            .json(&json!({ "capabilities": {} }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        let session_id = session
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                session
                    .get("value")
                    .and_then(|v| v.get("sessionId"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                DeviceError::Connection(format!("WebDriverAgent at {} opened no session", base_url))
            })?;

        let screen = request(
            &http,
            Method::GET,
            &format!("{}/session/{}/wda/screen", base_url, session_id),
            None,
        )
        .await?;
        let scale = screen.get("scale").and_then(Value::as_f64).unwrap_or(1.0);

        info!("WebDriverAgent session {} (scale {})", session_id, scale);
        Ok(Self {
            base_url,
            http,
            session_id,
            scale,
            closed: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        request(&self.http, method, &format!("{}{}", self.base_url, path), body).await
    }
}

async fn request(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value> {
    let mut builder = http.request(method, url);
    if let Some(body) = body {
        builder = builder.json(&body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    unwrap_value(status, body)
}

#[async_trait]
impl WdaSession for WdaClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    async fn screenshot(&self) -> Result<DynamicImage> {
        let value = self.call(Method::GET, "/screenshot", None).await?;
        let encoded: String = value
            .as_str()
            .ok_or_else(|| DeviceError::Capture("screenshot is not a string".to_string()))?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let bytes = general_purpose::STANDARD.decode(encoded)?;
        Ok(image::load_from_memory(&bytes)?)
    }

    async fn source(&self) -> Result<Value> {
        self.call(Method::GET, "/source?format=json", None).await
    }

    async fn window_size(&self) -> Result<(u32, u32)> {
        let path = format!("/session/{}/window/size", self.session_id);
        let value = self.call(Method::GET, &path, None).await?;
        let dimension = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_f64)
                .map(|v| v.round() as u32)
                .ok_or_else(|| DeviceError::Parse(format!("window size without {}", name)))
        };
        Ok((dimension("width")?, dimension("height")?))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let path = format!("/session/{}", self.session_id);
        self.call(Method::DELETE, &path, None).await?;
        debug!("closed WebDriverAgent session {}", self.session_id);
        Ok(())
    }
}
