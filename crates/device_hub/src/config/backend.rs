//! Backend locations and fixture defaults

use std::env;

/// Where the backend tools live and how they are reached
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Path to the `adb` executable
    pub adb_path: String,
    /// Path to libimobiledevice's `idevicescreenshot`, used as the iOS capture fallback
    pub idevicescreenshot_path: String,
    /// WebDriverAgent URL used when an iOS address is empty
    pub default_wda_url: String,
    /// Port the uiautomator2 server listens on inside the device
    pub uiautomator_device_port: u16,
    /// Window size reported by fixture devices
    pub fixture_resolution: (u32, u32),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            adb_path: env::var("DEVICE_HUB_ADB_PATH").unwrap_or_else(|_| "adb".to_string()),
            idevicescreenshot_path: env::var("DEVICE_HUB_IDEVICESCREENSHOT_PATH")
                .unwrap_or_else(|_| "idevicescreenshot".to_string()),
            default_wda_url: env::var("DEVICE_HUB_WDA_URL")
                .unwrap_or_else(|_| "http://localhost:8100".to_string()),
            uiautomator_device_port: env::var("DEVICE_HUB_U2_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9008),
            fixture_resolution: env::var("DEVICE_HUB_FIXTURE_RESOLUTION")
                .ok()
                .and_then(|v| parse_resolution(&v))
                .unwrap_or((1080, 2400)),
        }
    }
}

/// Parse a `WIDTHxHEIGHT` string
pub fn parse_resolution(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.trim().split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}
