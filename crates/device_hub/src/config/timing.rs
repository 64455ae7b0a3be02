//! Timeout configuration for backend calls

use std::env;
use std::time::Duration;

/// Timeouts applied by the backend clients, in seconds
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Generic `adb` invocations (dumpsys, wm size, forward, ...)
    pub command_timeout: f64,
    /// Screenshot captures, which move the most data
    pub screenshot_timeout: f64,
    /// UI hierarchy dumps
    pub dump_timeout: f64,
    /// Single HTTP request against uiautomator2 or WebDriverAgent
    pub http_timeout: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            command_timeout: env::var("DEVICE_HUB_COMMAND_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10.0),
            screenshot_timeout: env::var("DEVICE_HUB_SCREENSHOT_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15.0),
            dump_timeout: env::var("DEVICE_HUB_DUMP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30.0),
            http_timeout: env::var("DEVICE_HUB_HTTP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30.0),
        }
    }
}

impl TimingConfig {
    pub fn command(&self) -> Duration {
        Duration::from_secs_f64(self.command_timeout)
    }

    pub fn screenshot(&self) -> Duration {
        Duration::from_secs_f64(self.screenshot_timeout)
    }

    pub fn dump(&self) -> Duration {
        Duration::from_secs_f64(self.dump_timeout)
    }

    pub fn http(&self) -> Duration {
        Duration::from_secs_f64(self.http_timeout)
    }
}
