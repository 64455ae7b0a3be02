//! `adb` process client bound to one device serial

use image::DynamicImage;
use lazy_static::lazy_static;
use regex::Regex;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{Config, TimingConfig};
use crate::device::ForegroundApp;
use crate::error::{DeviceError, Result};

lazy_static! {
    static ref FOCUS_RES: [Regex; 2] = [
        Regex::new(r"mCurrentFocus=Window\{\S+ \S+ (?P<package>[^\s/{}]+)/(?P<activity>[^\s{}]+)\}")
            .expect("valid focus regex"),
        Regex::new(r"mFocusedApp=.*ActivityRecord\{\S+ \S+ (?P<package>[^\s/{}]+)/(?P<activity>[^\s{}]+)")
            .expect("valid focused app regex"),
    ];
    static ref WM_SIZE_RE: Regex =
        Regex::new(r"(?P<kind>Physical|Override) size: (?P<w>\d+)x(?P<h>\d+)").expect("valid wm size regex");
}

/// Type of ADB connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Usb,
    Emulator,
    Remote,
}

/// Information about an attached device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub device_id: String,
    pub status: String,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
}

impl DeviceInfo {
    pub fn is_online(&self) -> bool {
        self.status == "device"
    }
}

/// Parse the output of `adb devices -l`
pub fn parse_devices(stdout: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let device_id = parts[0].to_string();
        let connection_type = if device_id.contains(':') {
            ConnectionType::Remote
        } else if device_id.starts_with("emulator-") {
            ConnectionType::Emulator
        } else {
            ConnectionType::Usb
        };

        let model = parts[2..]
            .iter()
            .find_map(|part| part.strip_prefix("model:"))
            .map(|s| s.to_string());

        devices.push(DeviceInfo {
            device_id,
            status: parts[1].to_string(),
            connection_type,
            model,
        });
    }

    devices
}

/// Cut the XML document out of `uiautomator dump /dev/tty` output.
///
/// uiautomator appends a "dumped to" banner after the closing tag.
pub fn extract_hierarchy(raw: &str) -> Option<&str> {
    let start = raw.find("<?xml").or_else(|| raw.find("<hierarchy"))?;
    let end = raw.rfind("</hierarchy>")? + "</hierarchy>".len();
    (start < end).then(|| &raw[start..end])
}

/// Find the focused component in `dumpsys window` output
pub fn parse_current_focus(dumpsys: &str) -> Option<ForegroundApp> {
    FOCUS_RES.iter().find_map(|re| {
        dumpsys.lines().find_map(|line| {
            re.captures(line).map(|caps| ForegroundApp {
                package: caps["package"].to_string(),
                activity: caps["activity"].to_string(),
            })
        })
    })
}

/// Parse `wm size`; an override size wins over the physical one
pub fn parse_wm_size(stdout: &str) -> Option<(u32, u32)> {
    let mut physical = None;
    let mut overridden = None;

    for caps in WM_SIZE_RE.captures_iter(stdout) {
        let size = match (caps["w"].parse(), caps["h"].parse()) {
            (Ok(w), Ok(h)) => (w, h),
            _ => continue,
        };
        match &caps["kind"] {
            "Override" => overridden = Some(size),
            _ => physical = Some(size),
        }
    }

    overridden.or(physical)
}

async fn exec(adb_path: &str, args: &[&str], timeout: Duration) -> Result<Output> {
    debug!("{} {}", adb_path, args.join(" "));

    tokio::time::timeout(
        timeout,
        Command::new(adb_path).args(args).kill_on_drop(true).output(),
    )
    .await
    .map_err(|_| {
        DeviceError::Timeout(format!(
            "adb {} timed out after {}s",
            args.join(" "),
            timeout.as_secs_f64()
        ))
    })?
    .map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            DeviceError::Connection(format!("adb executable not found: {}", adb_path))
        }
        _ => DeviceError::Io(e),
    })
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr).trim().to_string()
}

/// List attached devices
pub async fn list_devices(adb_path: &str, timeout: Duration) -> Result<Vec<DeviceInfo>> {
    let output = exec(adb_path, &["devices", "-l"], timeout).await?;
    if !output.status.success() {
        return Err(DeviceError::CommandFailed(combined_output(&output)));
    }
    Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
}

/// `adb` bound to one device
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb_path: String,
    serial: String,
    timing: TimingConfig,
}

impl AdbClient {
    /// Resolve `address` to an online device.
    ///
    /// An empty address selects `$ANDROID_SERIAL` or the only attached device.
    /// A `host:port` address is `adb connect`ed first.
    pub async fn connect(address: &str, config: &Config) -> Result<Self> {
        let adb_path = config.backend.adb_path.clone();
        let timing = config.timing.clone();

        let serial = if address.is_empty() {
            match std::env::var("ANDROID_SERIAL") {
                Ok(serial) if !serial.is_empty() => serial,
                _ => Self::sole_device(&adb_path, timing.command()).await?,
            }
        } else {
            if address.contains(':') {
                Self::connect_remote(&adb_path, address, timing.command()).await?;
            }
            address.to_string()
        };

        let devices = list_devices(&adb_path, timing.command()).await?;
        match devices.iter().find(|d| d.device_id == serial) {
            Some(d) if d.is_online() => {}
            Some(d) => {
                return Err(DeviceError::Connection(format!(
                    "device {} is {}",
                    serial, d.status
                )))
            }
            None => {
                return Err(DeviceError::Connection(format!(
                    "device {} not found",
                    serial
                )))
            }
        }

        info!("adb device ready: {}", serial);
        Ok(Self {
            adb_path,
            serial,
            timing,
        })
    }

    async fn sole_device(adb_path: &str, timeout: Duration) -> Result<String> {
        let online: Vec<DeviceInfo> = list_devices(adb_path, timeout)
            .await?
            .into_iter()
            .filter(DeviceInfo::is_online)
            .collect();

        match online.as_slice() {
            [only] => Ok(only.device_id.clone()),
            [] => Err(DeviceError::Connection("no device attached".to_string())),
            _ => Err(DeviceError::Connection(format!(
                "{} devices attached, specify a serial",
                online.len()
            ))),
        }
    }

    async fn connect_remote(adb_path: &str, address: &str, timeout: Duration) -> Result<()> {
        let output = exec(adb_path, &["connect", address], timeout).await?;
        let combined = combined_output(&output);

        // "connected to" and "already connected to" both count
        if combined.to_lowercase().contains("connected to") {
            debug!("adb connect {}: {}", address, combined);
            Ok(())
        } else {
            Err(DeviceError::Connection(combined))
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<Output> {
        let mut full = vec!["-s", self.serial.as_str()];
        full.extend_from_slice(args);
        exec(&self.adb_path, &full, timeout).await
    }

    /// Run a shell command and return its stdout
    pub async fn shell(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        let output = self.run(&full, self.timing.command()).await?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed(combined_output(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn screenshot(&self) -> Result<DynamicImage> {
        let output = self
            .run(&["exec-out", "screencap", "-p"], self.timing.screenshot())
            .await?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(DeviceError::Capture(format!(
                "screencap on {} failed: {}",
                self.serial,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!("screencap returned {} bytes", output.stdout.len());
        image::load_from_memory(&output.stdout)
            .map_err(|e| DeviceError::Capture(format!("undecodable screencap output: {}", e)))
    }

    pub async fn dump_hierarchy(&self) -> Result<String> {
        let output = self
            .run(
                &["exec-out", "uiautomator", "dump", "/dev/tty"],
                self.timing.dump(),
            )
            .await?;

        let raw = String::from_utf8_lossy(&output.stdout);
        extract_hierarchy(&raw)
            .map(str::to_string)
            .ok_or_else(|| {
                DeviceError::CommandFailed(format!(
                    "uiautomator dump produced no hierarchy: {}",
                    combined_output(&output)
                ))
            })
    }

    pub async fn app_current(&self) -> Result<ForegroundApp> {
        let stdout = self.shell(&["dumpsys", "window"]).await?;
        if stdout.is_empty() {
            return Err(DeviceError::CommandFailed(
                "No output from dumpsys window".to_string(),
            ));
        }
        parse_current_focus(&stdout).ok_or_else(|| {
            DeviceError::CommandFailed("no focused activity in dumpsys window".to_string())
        })
    }

    pub async fn window_size(&self) -> Result<(u32, u32)> {
        let stdout = self.shell(&["wm", "size"]).await?;
        parse_wm_size(&stdout).ok_or_else(|| {
            DeviceError::CommandFailed(format!("unexpected wm size output: {}", stdout.trim()))
        })
    }

    /// Forward a free local port to `device_port`, returning the local port
    pub async fn forward(&self, device_port: u16) -> Result<u16> {
        let remote = format!("tcp:{}", device_port);
        let output = self
            .run(&["forward", "tcp:0", remote.as_str()], self.timing.command())
            .await?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed(combined_output(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.trim().parse().map_err(|_| {
            DeviceError::CommandFailed(format!("unexpected adb forward output: {}", stdout.trim()))
        })
    }

    pub async fn remove_forward(&self, local_port: u16) -> Result<()> {
        let local = format!("tcp:{}", local_port);
        let output = self
            .run(&["forward", "--remove", local.as_str()], self.timing.command())
            .await?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed(combined_output(&output)));
        }
        Ok(())
    }
}
